use crate::ast::TableSource;
use crate::sql_type::DataType;

/// resolves a column reference to the type of the column it names.
pub trait Schema {
    /// returns `None` when the table has no column at `index`.
    fn column_type(&self, source: TableSource, index: usize) -> Option<DataType>;
}

/// holds the column types of the tables an expression can read from and write to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub left: Vec<DataType>,
    pub right: Vec<DataType>,
    pub output: Vec<DataType>,
}

impl TableSchema {
    /// a schema with one input table and no right or output table columns.
    pub fn new(left: Vec<DataType>) -> TableSchema {
        TableSchema {
            left,
            ..TableSchema::default()
        }
    }
}

impl Schema for TableSchema {
    fn column_type(&self, source: TableSource, index: usize) -> Option<DataType> {
        let columns = match source {
            TableSource::Left => &self.left,
            TableSource::Right => &self.right,
            TableSource::Output => &self.output,
        };
        columns.get(index).copied()
    }
}

#[test]
fn test_table_schema_lookup() {
    use DataType::*;
    let schema = TableSchema {
        left: vec![Int32, Float64],
        right: vec![String],
        output: vec![],
    };
    assert_eq!(schema.column_type(TableSource::Left, 1), Some(Float64));
    assert_eq!(schema.column_type(TableSource::Right, 0), Some(String));
    assert_eq!(schema.column_type(TableSource::Right, 1), None);
    assert_eq!(schema.column_type(TableSource::Output, 0), None);
    assert_eq!(
        TableSchema::new(vec![Bool8]).column_type(TableSource::Left, 0),
        Some(Bool8)
    );
}
