//! `ir` defines the linear program: the flat, recursion-free form of one expression.
//!
//! The AST and the linear program are separate. The AST is a tree that the caller builds, and the
//! linear program is what a row-parallel evaluator runs once per row without any recursion.
//! As an example, this expression over an input table with `int32` columns:
//! ```text
//! mul(add(left[0], left[1]), 3:int32)
//! ```
//! becomes this program:
//! ```text
//! references:  0: column left[0]   1: column left[1]   2: intermediate 0
//!              3: literal 0        4: output 0
//! literals:    [3]
//! operators:   add, mul
//! indices:     0 1 2 | 2 3 4
//! ```
//! The evaluator runs the operators in order. For each one it reads the operands named by the
//! next `arity` indices and writes the result to the location named by the index after them.

use crate::data_reference::{DataReference, ReferenceTable};
use crate::operator::Operator;
use crate::sql_type::DataType;
use crate::sql_value::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    /// every storage location the program reads or writes.
    pub data_references: ReferenceTable,
    /// the values of all literal nodes, in visitation order.
    pub literals: Vec<Scalar>,
    /// one entry per operation node; operands always come before the operators using them.
    pub operators: Vec<Operator>,
    /// for each operator, its operand reference indices followed by its output reference index.
    pub operator_source_indices: Vec<usize>,
    /// the number of scratch slots each row needs.
    pub intermediate_slot_count: usize,
    /// the type of the value the whole expression produces.
    pub output_type: DataType,
}

/// one step of a linear program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub operator: Operator,
    pub operands: &'a [usize],
    pub output: usize,
}

impl LinearProgram {
    /// splits the flat index list into one instruction per operator.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            operators: self.operators.iter(),
            indices: &self.operator_source_indices,
        }
    }

    /// the reference the final result is written to, or read from when the expression is a
    /// bare literal or column.
    pub fn output_reference(&self) -> Option<&DataReference> {
        self.data_references.last()
    }
}

pub struct Instructions<'a> {
    operators: std::slice::Iter<'a, Operator>,
    indices: &'a [usize],
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Instruction<'a>> {
        let operator = *self.operators.next()?;
        let arity = operator.arity();
        if self.indices.len() < arity + 1 {
            return None;
        }
        let (chunk, rest) = self.indices.split_at(arity + 1);
        self.indices = rest;
        Some(Instruction {
            operator,
            operands: &chunk[..arity],
            output: chunk[arity],
        })
    }
}

#[test]
fn test_instructions_chunk_by_arity() {
    use crate::ast::TableSource;
    let mut data_references = ReferenceTable::new();
    data_references.intern(DataReference::column(DataType::Float64, 0, TableSource::Left));
    data_references.intern(DataReference::intermediate(DataType::Float64, 0));
    data_references.intern(DataReference::column(DataType::Float64, 1, TableSource::Left));
    data_references.intern(DataReference::output_column(DataType::Float64, 0));
    let program = LinearProgram {
        data_references,
        literals: vec![],
        operators: vec![Operator::Sqrt, Operator::Add],
        operator_source_indices: vec![0, 1, 1, 2, 3],
        intermediate_slot_count: 1,
        output_type: DataType::Float64,
    };
    let actual: Vec<Instruction> = program.instructions().collect();
    assert_eq!(
        actual,
        vec![
            Instruction {
                operator: Operator::Sqrt,
                operands: &[0],
                output: 1,
            },
            Instruction {
                operator: Operator::Add,
                operands: &[1, 2],
                output: 3,
            },
        ]
    );
    assert_eq!(
        program.output_reference(),
        Some(&DataReference::output_column(DataType::Float64, 0))
    );
}
