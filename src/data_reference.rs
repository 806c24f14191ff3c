//! describes where values live while a linear program runs, and interns those descriptions.

use crate::ast::TableSource;
use crate::sql_type::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `data_index` is a position in the literal pool.
    Literal,
    /// `data_index` is a column of the table named by `table_source`.
    Column,
    /// `data_index` is a scratch slot.
    Intermediate,
    /// `data_index` is a column of the output table.
    OutputColumn,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Literal => "literal".fmt(f),
            ReferenceKind::Column => "column".fmt(f),
            ReferenceKind::Intermediate => "intermediate".fmt(f),
            ReferenceKind::OutputColumn => "output".fmt(f),
        }
    }
}

/// names the storage location of one value. Two references are the same location exactly when
/// every field is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataReference {
    pub kind: ReferenceKind,
    pub data_type: DataType,
    pub data_index: usize,
    pub table_source: Option<TableSource>,
}

impl DataReference {
    pub fn literal(data_type: DataType, pool_index: usize) -> DataReference {
        DataReference {
            kind: ReferenceKind::Literal,
            data_type,
            data_index: pool_index,
            table_source: None,
        }
    }

    pub fn column(data_type: DataType, column_index: usize, source: TableSource) -> DataReference {
        DataReference {
            kind: ReferenceKind::Column,
            data_type,
            data_index: column_index,
            table_source: Some(source),
        }
    }

    pub fn intermediate(data_type: DataType, slot: usize) -> DataReference {
        DataReference {
            kind: ReferenceKind::Intermediate,
            data_type,
            data_index: slot,
            table_source: None,
        }
    }

    pub fn output_column(data_type: DataType, column_index: usize) -> DataReference {
        DataReference {
            kind: ReferenceKind::OutputColumn,
            data_type,
            data_index: column_index,
            table_source: None,
        }
    }
}

impl std::fmt::Display for DataReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.table_source {
            Some(source) => write!(
                f,
                "{} {}[{}] : {}",
                self.kind, source, self.data_index, self.data_type
            ),
            None => write!(f, "{} {} : {}", self.kind, self.data_index, self.data_type),
        }
    }
}

/// an append-only list of data references with no duplicates.
/// The position of a reference in the table is its identity in a linear program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: Vec<DataReference>,
}

impl ReferenceTable {
    pub fn new() -> ReferenceTable {
        ReferenceTable::default()
    }

    /// returns the index of the entry equal to `reference`, appending it first if there is none.
    pub fn intern(&mut self, reference: DataReference) -> usize {
        match self.entries.iter().position(|r| *r == reference) {
            Some(index) => index,
            None => {
                self.entries.push(reference);
                self.entries.len() - 1
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&DataReference> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&DataReference> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataReference> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[DataReference] {
        &self.entries
    }
}

impl std::ops::Index<usize> for ReferenceTable {
    type Output = DataReference;

    fn index(&self, index: usize) -> &DataReference {
        &self.entries[index]
    }
}

#[test]
fn test_intern_deduplicates() {
    let mut t = ReferenceTable::new();
    let a = t.intern(DataReference::column(DataType::Int32, 0, TableSource::Left));
    let b = t.intern(DataReference::column(DataType::Int32, 1, TableSource::Left));
    let a_again = t.intern(DataReference::column(DataType::Int32, 0, TableSource::Left));
    assert_eq!((a, b, a_again), (0, 1, 0));
    assert_eq!(t.len(), 2);
    assert_eq!(t.last(), Some(&DataReference::column(DataType::Int32, 1, TableSource::Left)));
}

#[test]
fn test_intern_distinguishes_every_field() {
    let base = DataReference::intermediate(DataType::Int64, 2);
    let variants = vec![
        DataReference {
            kind: ReferenceKind::OutputColumn,
            ..base
        },
        DataReference {
            data_type: DataType::Float64,
            ..base
        },
        DataReference {
            data_index: 3,
            ..base
        },
        DataReference {
            table_source: Some(TableSource::Right),
            ..base
        },
    ];
    let mut t = ReferenceTable::new();
    assert_eq!(t.intern(base), 0);
    for (i, v) in variants.into_iter().enumerate() {
        assert_eq!(t.intern(v), i + 1);
    }
    assert_eq!(t.intern(base), 0);
    assert_eq!(t.len(), 5);
}

#[test]
fn test_display_reference() {
    assert_eq!(
        DataReference::column(DataType::Int32, 4, TableSource::Right).to_string(),
        "column right[4] : int32"
    );
    assert_eq!(
        DataReference::intermediate(DataType::Float32, 1).to_string(),
        "intermediate 1 : float32"
    );
}
