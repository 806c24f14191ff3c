//! formatting prints out linear programs nicely, for debugging and for tests that compare
//! whole programs.

use crate::ir::LinearProgram;

impl std::fmt::Display for LinearProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "references:")?;
        for (i, r) in self.data_references.iter().enumerate() {
            let source = r.table_source.map(|s| s.to_string()).unwrap_or_default();
            writeln!(
                f,
                "{:3} | {:12} | {:6} | {:4} | {:22} |",
                i,
                r.kind.to_string(),
                source,
                r.data_index,
                r.data_type.to_string()
            )?;
        }
        if !self.literals.is_empty() {
            writeln!(f, "literals:")?;
            for (i, l) in self.literals.iter().enumerate() {
                writeln!(f, "{:3} | {}", i, l)?;
            }
        }
        writeln!(f, "instructions:")?;
        for (i, instruction) in self.instructions().enumerate() {
            writeln!(
                f,
                "{:3} | {:15} | {} -> {}",
                i,
                instruction.operator.to_string(),
                instruction
                    .operands
                    .iter()
                    .map(|x| x.to_string())
                    .collect::<Vec<String>>()
                    .join(" "),
                instruction.output
            )?;
        }
        writeln!(f, "intermediate slots: {}", self.intermediate_slot_count)?;
        write!(f, "output type: {}", self.output_type)
    }
}

#[test]
fn test_format_program() {
    use crate::ast::{Expression, TableSource};
    use crate::operator::Operator;
    use crate::sql_type::DataType;
    use crate::sql_value::Scalar;
    use crate::table_traits::TableSchema;

    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.literal(Scalar::Int64(2));
    let inner = e.operation(Operator::Mul, vec![a, b]).unwrap();
    let root = e.operation(Operator::Less, vec![inner, a]).unwrap();
    let schema = TableSchema::new(vec![DataType::Int64]);
    let program = crate::linearizer::linearize(&e, root, &schema).unwrap();
    let expected = "\
references:
  0 | column       | left   |    0 | int64                  |
  1 | literal      |        |    0 | int64                  |
  2 | intermediate |        |    0 | int64                  |
  3 | output       |        |    0 | bool8                  |
literals:
  0 | 2
instructions:
  0 | mul             | 0 1 -> 2
  1 | less            | 2 0 -> 3
intermediate slots: 1
output type: bool8";
    assert_eq!(program.to_string(), expected);
}
