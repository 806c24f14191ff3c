//! Lowers scalar expression trees into flat linear programs for a row-parallel evaluator.
//!
//! ```text
//! text --parser/pt_to_ast--> ast::Expression --linearizer--> ir::LinearProgram
//! ```
//! The linear program names every value by its storage location: a literal pool entry, an input
//! column, the output column, or a scratch slot. Scratch slots are reused as soon as the value in
//! them has been consumed, and the program reports how many slots each row needs.

pub mod ast;
pub mod data_reference;
mod formatting;
pub mod ir;
pub mod linearizer;
pub mod operator;
pub mod parser;
pub mod pt_to_ast;
pub mod slot_allocator;
pub mod sql_type;
pub mod sql_value;
pub mod table_traits;

pub use ast::{Expression, NodeId, TableSource};
pub use data_reference::{DataReference, ReferenceKind, ReferenceTable};
pub use ir::{Instruction, LinearProgram};
pub use linearizer::{linearize, linearize_with_registry, Error};
pub use operator::{DefaultTypeRegistry, Operator, TypeRegistry};
pub use sql_type::DataType;
pub use sql_value::Scalar;
pub use table_traits::{Schema, TableSchema};

/// parses `text` and linearizes it against `schema`.
pub fn compile<S: Schema>(text: &str, schema: &S) -> anyhow::Result<LinearProgram> {
    let (expression, root) = pt_to_ast::parse_expression(text)?;
    Ok(linearize(&expression, root, schema)?)
}
