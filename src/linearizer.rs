//! `linearizer` lowers an expression tree into a `LinearProgram`.
//!
//! The tree is walked depth first. An operation's operands are fully resolved, type and storage
//! location both, before the operation itself is, so operators are emitted in an order the
//! evaluator can run front to back.
//!
//! Storage locations are decided as the walk goes:
//!   - Literals go to the literal pool. Every literal node gets its own pool entry.
//!   - Column references read the column in place.
//!   - The root operation writes to output column 0.
//!   - Every other operation writes to a scratch slot. The slots of its operands are given back
//!     as soon as it has read them, so later operations reuse them.

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::ast::{ColumnReference, Expression, Literal, NodeId, Operation, TableSource, Visitor};
use crate::data_reference::{DataReference, ReferenceKind, ReferenceTable};
use crate::ir::LinearProgram;
use crate::operator::{self, DefaultTypeRegistry, Operator, TypeRegistry};
use crate::slot_allocator::SlotAllocator;
use crate::sql_type::DataType;
use crate::sql_value::Scalar;
use crate::table_traits::Schema;

/// the width in bytes of one scratch slot.
pub const INTERMEDIATE_SLOT_BYTES: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Operator {operator} was given operands of differing types: {}.", .types.iter().join(", "))]
    OperandTypeMismatch {
        operator: Operator,
        types: Vec<DataType>,
    },
    #[error("The result type {0} is not fixed width, so it cannot be stored in an intermediate.")]
    NotFixedWidth(DataType),
    #[error("The result type {data_type} is {size} bytes, too large to be stored in an intermediate.")]
    TooLargeForIntermediate { data_type: DataType, size: usize },
    #[error("No column {index} in the {table_source} table.")]
    ColumnNotFound {
        table_source: TableSource,
        index: usize,
    },
    #[error("Node {0} is not part of the expression.")]
    UnknownNode(NodeId),
    #[error(transparent)]
    Operator(#[from] operator::Error),
}

/// linearizes the tree rooted at `root`, resolving result types with the built-in rules.
pub fn linearize<S: Schema>(
    expression: &Expression,
    root: NodeId,
    schema: &S,
) -> Result<LinearProgram, Error> {
    linearize_with_registry(expression, root, schema, &DefaultTypeRegistry)
}

/// linearizes the tree rooted at `root`, resolving result types with `registry`.
#[instrument(level = "trace", skip(expression, schema, registry))]
pub fn linearize_with_registry<S: Schema, R: TypeRegistry>(
    expression: &Expression,
    root: NodeId,
    schema: &S,
    registry: &R,
) -> Result<LinearProgram, Error> {
    if !expression.contains(root) {
        return Err(Error::UnknownNode(root));
    }
    let mut linearizer = Linearizer::new(schema, registry);
    expression.accept(root, &mut linearizer)?;
    let program = linearizer.finish();
    debug!(
        references = program.data_references.len(),
        literals = program.literals.len(),
        operators = program.operators.len(),
        intermediate_slots = program.intermediate_slot_count,
        output_type = %program.output_type,
        "linearized expression"
    );
    Ok(program)
}

/// holds the state of one linearization run. It is created for a single tree and consumed by
/// `finish`.
struct Linearizer<'a, S, R> {
    schema: &'a S,
    registry: &'a R,
    node_count: usize,
    // Visit indices of the operations whose operands are still being walked, innermost last.
    open_operations: Vec<usize>,
    data_references: ReferenceTable,
    literals: Vec<Scalar>,
    operators: Vec<Operator>,
    operator_source_indices: Vec<usize>,
    intermediates: SlotAllocator,
}

impl<'a, S: Schema, R: TypeRegistry> Linearizer<'a, S, R> {
    fn new(schema: &'a S, registry: &'a R) -> Self {
        Linearizer {
            schema,
            registry,
            node_count: 0,
            open_operations: vec![],
            data_references: ReferenceTable::new(),
            literals: vec![],
            operators: vec![],
            operator_source_indices: vec![],
            intermediates: SlotAllocator::new(),
        }
    }

    fn finish(self) -> LinearProgram {
        let output_type = self.root_data_type();
        LinearProgram {
            data_references: self.data_references,
            literals: self.literals,
            operators: self.operators,
            operator_source_indices: self.operator_source_indices,
            intermediate_slot_count: self.intermediates.peak(),
            output_type,
        }
    }

    // The root's output is always the last reference added. A run that visited nothing has no
    // output, which is reported as `Empty`.
    fn root_data_type(&self) -> DataType {
        self.data_references
            .last()
            .map_or(DataType::Empty, |r| r.data_type)
    }

    fn output_reference(
        &mut self,
        is_root: bool,
        data_type: DataType,
    ) -> Result<DataReference, Error> {
        if is_root {
            // The root writes straight to the output column.
            return Ok(DataReference::output_column(data_type, 0));
        }
        match data_type.size_of() {
            None => Err(Error::NotFixedWidth(data_type)),
            Some(size) if size > INTERMEDIATE_SLOT_BYTES => {
                Err(Error::TooLargeForIntermediate { data_type, size })
            }
            Some(_) => {
                let slot = self.intermediates.take();
                trace!(slot, %data_type, "took intermediate slot");
                Ok(DataReference::intermediate(data_type, slot))
            }
        }
    }
}

impl<S: Schema, R: TypeRegistry> Visitor for Linearizer<'_, S, R> {
    type Output = Result<usize, Error>;

    fn visit_literal(&mut self, literal: &Literal) -> Result<usize, Error> {
        self.node_count += 1;
        let data_type = literal.value.data_type();
        let pool_index = self.literals.len();
        self.literals.push(literal.value.clone());
        Ok(self
            .data_references
            .intern(DataReference::literal(data_type, pool_index)))
    }

    fn visit_column_reference(&mut self, column: &ColumnReference) -> Result<usize, Error> {
        self.node_count += 1;
        let data_type = self
            .schema
            .column_type(column.table_source, column.column_index)
            .ok_or(Error::ColumnNotFound {
                table_source: column.table_source,
                index: column.column_index,
            })?;
        Ok(self.data_references.intern(DataReference::column(
            data_type,
            column.column_index,
            column.table_source,
        )))
    }

    fn enter_operation(&mut self, _operation: &Operation) {
        self.open_operations.push(self.node_count);
        self.node_count += 1;
    }

    fn visit_operation(
        &mut self,
        operation: &Operation,
        operands: Vec<Result<usize, Error>>,
    ) -> Result<usize, Error> {
        // The root is the first node the walk reaches.
        let is_root = self.open_operations.pop() == Some(0);
        let operand_indices = operands.into_iter().collect::<Result<Vec<usize>, Error>>()?;

        let operand_sources: Vec<DataReference> = operand_indices
            .iter()
            .map(|i| self.data_references[*i])
            .collect();
        let operand_types: Vec<DataType> = operand_sources.iter().map(|r| r.data_type).collect();
        if !operand_types.iter().all_equal() {
            return Err(Error::OperandTypeMismatch {
                operator: operation.operator,
                types: operand_types,
            });
        }

        // This operation consumes its intermediate operands, so their slots are free again.
        for source in operand_sources
            .iter()
            .filter(|r| r.kind == ReferenceKind::Intermediate)
        {
            self.intermediates.give(source.data_index);
        }

        let data_type = self
            .registry
            .return_type(operation.operator, &operand_types)?;
        self.operators.push(operation.operator);
        let output = self.output_reference(is_root, data_type)?;
        let index = self.data_references.intern(output);
        trace!(operator = %operation.operator, %output, index, "emitted operator");

        self.operator_source_indices.extend(operand_indices);
        self.operator_source_indices.push(index);
        Ok(index)
    }
}

#[cfg(test)]
use crate::table_traits::TableSchema;
#[cfg(test)]
use DataType::*;

#[cfg(test)]
fn schema() -> TableSchema {
    TableSchema {
        left: vec![Int32, Int32, Int64, Float64, String, Decimal128, Bool8],
        right: vec![Int32],
        output: vec![Int32],
    }
}

#[test]
fn test_single_literal() {
    let mut e = Expression::new();
    let root = e.literal(Scalar::Float32(2.5));
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(p.data_references.as_slice(), &[DataReference::literal(Float32, 0)]);
    assert_eq!(p.literals, vec![Scalar::Float32(2.5)]);
    assert!(p.operators.is_empty());
    assert!(p.operator_source_indices.is_empty());
    assert_eq!(p.intermediate_slot_count, 0);
    assert_eq!(p.output_type, Float32);
}

#[test]
fn test_single_column_is_not_redirected() {
    let mut e = Expression::new();
    let root = e.column(TableSource::Left, 3);
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(
        p.data_references.as_slice(),
        &[DataReference::column(Float64, 3, TableSource::Left)]
    );
    assert_eq!(p.output_type, Float64);
}

#[test]
fn test_add_two_columns() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let root = e.operation(Operator::Add, vec![a, b]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(
        p.data_references.as_slice(),
        &[
            DataReference::column(Int32, 0, TableSource::Left),
            DataReference::column(Int32, 1, TableSource::Left),
            DataReference::output_column(Int32, 0),
        ]
    );
    assert_eq!(p.operators, vec![Operator::Add]);
    assert_eq!(p.operator_source_indices, vec![0, 1, 2]);
    assert_eq!(p.intermediate_slot_count, 0);
    assert_eq!(p.output_type, Int32);
}

#[test]
fn test_same_column_twice_is_interned_once() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let a2 = e.column(TableSource::Left, 0);
    let root = e.operation(Operator::Mul, vec![a, a2]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(p.data_references.len(), 2);
    assert_eq!(p.operator_source_indices, vec![0, 0, 1]);
}

#[test]
fn test_equal_literals_get_separate_pool_entries() {
    let mut e = Expression::new();
    let a = e.literal(Scalar::Int64(7));
    let b = e.literal(Scalar::Int64(7));
    let root = e.operation(Operator::Add, vec![a, b]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(p.literals, vec![Scalar::Int64(7), Scalar::Int64(7)]);
    assert_eq!(p.operator_source_indices, vec![0, 1, 2]);
}

#[test]
fn test_nested_add_uses_one_slot() {
    // add(add(a, b), c)
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let inner = e.operation(Operator::Add, vec![a, b]).unwrap();
    let c = e.column(TableSource::Right, 0);
    let root = e.operation(Operator::Add, vec![inner, c]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(
        p.data_references.as_slice(),
        &[
            DataReference::column(Int32, 0, TableSource::Left),
            DataReference::column(Int32, 1, TableSource::Left),
            DataReference::intermediate(Int32, 0),
            DataReference::column(Int32, 0, TableSource::Right),
            DataReference::output_column(Int32, 0),
        ]
    );
    assert_eq!(p.operators, vec![Operator::Add, Operator::Add]);
    assert_eq!(p.operator_source_indices, vec![0, 1, 2, 2, 3, 4]);
    assert_eq!(p.intermediate_slot_count, 1);
}

#[test]
fn test_balanced_tree_needs_two_slots_and_shares_rows() {
    // sub(add(mul(a, b), mul(a, b)), a): both products are live at once, and the sum
    // reuses the first product's slot and so its table row.
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let l = e.operation(Operator::Mul, vec![a, b]).unwrap();
    let r = e.operation(Operator::Mul, vec![a, b]).unwrap();
    let sum = e.operation(Operator::Add, vec![l, r]).unwrap();
    let c = e.column(TableSource::Left, 0);
    let root = e.operation(Operator::Sub, vec![sum, c]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    // refs: 0 a, 1 b, 2 slot0, 3 slot1, (sum -> slot0 again = 2), 4 output.
    assert_eq!(p.data_references.len(), 5);
    assert_eq!(
        p.operator_source_indices,
        vec![0, 1, 2, 0, 1, 3, 2, 3, 2, 2, 0, 4]
    );
    assert_eq!(p.intermediate_slot_count, 2);
}

#[test]
fn test_operand_type_mismatch() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 2);
    let root = e.operation(Operator::Add, vec![a, b]).unwrap();
    assert_eq!(
        linearize(&e, root, &schema()),
        Err(Error::OperandTypeMismatch {
            operator: Operator::Add,
            types: vec![Int32, Int64],
        })
    );
}

#[test]
fn test_intermediate_storage_errors() {
    struct Case {
        desc: &'static str,
        column: usize,
        operator: Operator,
        expected: Error,
    }
    let cases = vec![
        Case {
            desc: "string intermediate",
            column: 4,
            operator: Operator::Identity,
            expected: Error::NotFixedWidth(String),
        },
        Case {
            desc: "decimal128 intermediate",
            column: 5,
            operator: Operator::Identity,
            expected: Error::TooLargeForIntermediate {
                data_type: Decimal128,
                size: 16,
            },
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        // identity(identity(x)): only the inner node needs an intermediate.
        let mut e = Expression::new();
        let x = e.column(TableSource::Left, case.column);
        let inner = e.operation(case.operator, vec![x]).unwrap();
        let root = e.operation(Operator::Identity, vec![inner]).unwrap();
        assert_eq!(linearize(&e, root, &schema()), Err(case.expected));

        // As the root, the same operation writes to the output column and is fine.
        let p = linearize(&e, inner, &schema()).unwrap();
        assert_eq!(p.output_reference().unwrap().kind, ReferenceKind::OutputColumn);
    }
}

#[test]
fn test_registry_errors_propagate() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 6);
    let b = e.column(TableSource::Left, 6);
    let root = e.operation(Operator::Add, vec![a, b]).unwrap();
    assert_eq!(
        linearize(&e, root, &schema()),
        Err(Error::Operator(operator::Error::UnsupportedOperandType {
            operator: Operator::Add,
            data_type: Bool8,
        }))
    );

    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let root = e.operation(Operator::Add, vec![a]).unwrap();
    assert_eq!(
        linearize(&e, root, &schema()),
        Err(Error::Operator(operator::Error::ArityMismatch {
            operator: Operator::Add,
            expected: 2,
            actual: 1,
        }))
    );
}

#[test]
fn test_missing_column_and_unknown_root() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Right, 5);
    assert_eq!(
        linearize(&e, a, &schema()),
        Err(Error::ColumnNotFound {
            table_source: TableSource::Right,
            index: 5,
        })
    );
    assert_eq!(
        linearize(&e, NodeId(1), &schema()),
        Err(Error::UnknownNode(NodeId(1)))
    );
}

#[test]
fn test_custom_registry() {
    struct AlwaysInt8;
    impl TypeRegistry for AlwaysInt8 {
        fn return_type(&self, _: Operator, _: &[DataType]) -> Result<DataType, operator::Error> {
            Ok(Int8)
        }
    }
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 4);
    let b = e.column(TableSource::Left, 4);
    let inner = e.operation(Operator::Less, vec![a, b]).unwrap();
    let root = e.operation(Operator::Not, vec![inner]).unwrap();
    let p = linearize_with_registry(&e, root, &schema(), &AlwaysInt8).unwrap();
    assert_eq!(p.output_type, Int8);
    assert_eq!(p.data_references[1], DataReference::intermediate(Int8, 0));
}

#[test]
fn test_operators_follow_their_operands() {
    // sub(mul(a, 2), add(b, mul(a, b)))
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let two = e.literal(Scalar::Int32(2));
    let m1 = e.operation(Operator::Mul, vec![a, two]).unwrap();
    let b = e.column(TableSource::Left, 1);
    let m2 = e.operation(Operator::Mul, vec![a, b]).unwrap();
    let s = e.operation(Operator::Add, vec![b, m2]).unwrap();
    let root = e.operation(Operator::Sub, vec![m1, s]).unwrap();
    let p = linearize(&e, root, &schema()).unwrap();
    assert_eq!(
        p.operators,
        vec![Operator::Mul, Operator::Mul, Operator::Add, Operator::Sub]
    );
    let mut written: Vec<usize> = vec![];
    for instruction in p.instructions() {
        for operand in instruction.operands {
            let r = p.data_references[*operand];
            if r.kind == ReferenceKind::Intermediate {
                assert!(written.contains(operand), "read before write: {}", r);
            }
        }
        written.push(instruction.output);
    }
    assert_eq!(
        p.output_reference(),
        Some(&DataReference::output_column(Int32, 0))
    );
    assert_eq!(p.intermediate_slot_count, 2);
}

#[test]
fn test_no_references_gives_empty_output_type() {
    let e = Expression::new();
    let p = Linearizer::new(&schema(), &DefaultTypeRegistry).finish();
    assert!(p.data_references.is_empty());
    assert_eq!(p.output_type, Empty);
    assert_eq!(p.intermediate_slot_count, 0);
}

#[test]
fn test_very_deep_chains() {
    const DEPTH: usize = 100_000;

    // add(add(...add(a, b)..., a), b)
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let mut acc = e.operation(Operator::Add, vec![a, b]).unwrap();
    for i in 1..DEPTH {
        let next = if i % 2 == 0 { a } else { b };
        acc = e.operation(Operator::Add, vec![acc, next]).unwrap();
    }
    let p = linearize(&e, acc, &schema()).unwrap();
    assert_eq!(p.operators.len(), DEPTH);
    assert_eq!(p.operator_source_indices.len(), 3 * DEPTH);
    assert_eq!(p.intermediate_slot_count, 1);
    // Both columns, the one intermediate row and the output.
    assert_eq!(p.data_references.len(), 4);
    assert_eq!(p.output_reference(), Some(&DataReference::output_column(Int32, 0)));

    // identity(identity(...identity(left[0])...))
    let mut e = Expression::new();
    let mut acc = e.column(TableSource::Left, 0);
    for _ in 0..DEPTH {
        acc = e.operation(Operator::Identity, vec![acc]).unwrap();
    }
    let p = linearize(&e, acc, &schema()).unwrap();
    assert_eq!(p.operators.len(), DEPTH);
    assert_eq!(p.intermediate_slot_count, 1);

    // A missing column at the bottom of the chain is reported, not a crash.
    let mut e = Expression::new();
    let mut acc = e.column(TableSource::Right, 9);
    for _ in 0..DEPTH {
        acc = e.operation(Operator::Identity, vec![acc]).unwrap();
    }
    assert_eq!(
        linearize(&e, acc, &schema()),
        Err(Error::ColumnNotFound {
            table_source: TableSource::Right,
            index: 9,
        })
    );
}
