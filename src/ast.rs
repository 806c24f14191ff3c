//! This module defines the abstract syntax tree (AST) types for scalar expressions.
//!
//! An `Expression` is an arena: it owns every node, and an `Operation` names its operands by
//! `NodeId` instead of owning them. Nodes can only refer to nodes added before them, so the
//! arena can never hold a cycle and operands always outlive the operations that use them.

use enum_as_inner::EnumAsInner;

use crate::operator::Operator;
use crate::sql_value::Scalar;

/// selects which table a column reference is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableSource {
    Left,
    Right,
    Output,
}

impl std::fmt::Display for TableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSource::Left => "left".fmt(f),
            TableSource::Right => "right".fmt(f),
            TableSource::Output => "output".fmt(f),
        }
    }
}

/// indexes a node within the `Expression` that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Scalar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnReference {
    pub column_index: usize,
    pub table_source: TableSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub operator: Operator,
    pub operands: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Node {
    Literal(Literal),
    ColumnReference(ColumnReference),
    Operation(Operation),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Operand {0} does not name a node already in the expression.")]
    UnknownOperand(NodeId),
}

/// walks an `Expression`, one method per node kind.
/// Operands are visited before the operation that uses them, so `visit_operation` receives their
/// outputs in operand order.
pub trait Visitor {
    type Output;
    fn visit_literal(&mut self, literal: &Literal) -> Self::Output;
    fn visit_column_reference(&mut self, column: &ColumnReference) -> Self::Output;
    /// called when the walk reaches `operation`, before any of its operands are visited.
    fn enter_operation(&mut self, _operation: &Operation) {}
    fn visit_operation(
        &mut self,
        operation: &Operation,
        operands: Vec<Self::Output>,
    ) -> Self::Output;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    nodes: Vec<Node>,
}

impl Expression {
    pub fn new() -> Expression {
        Expression::default()
    }

    pub fn literal(&mut self, value: Scalar) -> NodeId {
        self.push(Node::Literal(Literal { value }))
    }

    pub fn column(&mut self, table_source: TableSource, column_index: usize) -> NodeId {
        self.push(Node::ColumnReference(ColumnReference {
            column_index,
            table_source,
        }))
    }

    /// adds an operation over nodes already in this expression.
    /// The operand count is not checked against the operator's arity here; that happens when the
    /// expression is linearized.
    pub fn operation(&mut self, operator: Operator, operands: Vec<NodeId>) -> Result<NodeId, Error> {
        if let Some(bad) = operands.iter().find(|id| id.0 >= self.nodes.len()) {
            return Err(Error::UnknownOperand(*bad));
        }
        Ok(self.push(Node::Operation(Operation { operator, operands })))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// walks the tree rooted at `id` depth first, calling the visitor method matching each node's
    /// kind. The walk keeps its own stack, so its depth is not limited by the thread's stack.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this expression.
    pub fn accept<V: Visitor>(&self, id: NodeId, visitor: &mut V) -> V::Output {
        enum Step<'a> {
            Enter(NodeId),
            Exit(&'a Operation),
        }
        let mut steps = vec![Step::Enter(id)];
        let mut outputs: Vec<V::Output> = vec![];
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(id) => match &self.nodes[id.0] {
                    Node::Literal(l) => outputs.push(visitor.visit_literal(l)),
                    Node::ColumnReference(c) => outputs.push(visitor.visit_column_reference(c)),
                    Node::Operation(o) => {
                        visitor.enter_operation(o);
                        steps.push(Step::Exit(o));
                        steps.extend(o.operands.iter().rev().map(|operand| Step::Enter(*operand)));
                    }
                },
                Step::Exit(o) => {
                    let operands = outputs.split_off(outputs.len() - o.operands.len());
                    outputs.push(visitor.visit_operation(o, operands));
                }
            }
        }
        // Every node pushes one output and every operation consumes its operands' outputs.
        outputs
            .pop()
            .expect("a walk always produces an output for its root")
    }

    /// renders node `id` and its operands in call syntax, e.g. `add(left[0], 1:int32)`.
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { expr: self, id }
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

pub struct NodeDisplay<'a> {
    expr: &'a Expression,
    id: NodeId,
}

impl std::fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        enum Piece {
            Node(NodeId),
            Text(&'static str),
        }
        let mut pieces = vec![Piece::Node(self.id)];
        while let Some(piece) = pieces.pop() {
            let id = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(id) => id,
            };
            match self.expr.node(id) {
                None => write!(f, "<unknown node {}>", id)?,
                Some(Node::Literal(l)) => write!(f, "{}:{}", l.value, l.value.data_type())?,
                Some(Node::ColumnReference(c)) => {
                    write!(f, "{}[{}]", c.table_source, c.column_index)?
                }
                Some(Node::Operation(o)) => {
                    write!(f, "{}(", o.operator)?;
                    pieces.push(Piece::Text(")"));
                    for (i, operand) in o.operands.iter().enumerate().rev() {
                        pieces.push(Piece::Node(*operand));
                        if i > 0 {
                            pieces.push(Piece::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
fn make_add_tree() -> (Expression, NodeId) {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let inner = e.operation(Operator::Add, vec![a, b]).unwrap();
    let c = e.literal(Scalar::Int32(3));
    let root = e.operation(Operator::Mul, vec![inner, c]).unwrap();
    (e, root)
}

#[test]
fn test_build_expression() {
    let (e, root) = make_add_tree();
    assert_eq!(e.len(), 5);
    assert_eq!(root, NodeId(4));
    let op = e.node(root).unwrap().as_operation().unwrap();
    assert_eq!(op.operator, Operator::Mul);
    assert_eq!(op.operands, vec![NodeId(2), NodeId(3)]);
    assert!(e.node(NodeId(0)).unwrap().is_column_reference());
    assert!(e.node(NodeId(3)).unwrap().is_literal());
    assert!(e.node(NodeId(5)).is_none());
}

#[test]
fn test_operation_rejects_unknown_operand() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    assert_eq!(
        e.operation(Operator::Add, vec![a, NodeId(1)]),
        Err(Error::UnknownOperand(NodeId(1)))
    );
    // A failed operation leaves the arena unchanged.
    assert_eq!(e.len(), 1);
}

#[test]
fn test_display_expression() {
    let (e, root) = make_add_tree();
    assert_eq!(
        e.display(root).to_string(),
        "mul(add(left[0], left[1]), 3:int32)"
    );
    assert_eq!(e.display(NodeId(9)).to_string(), "<unknown node #9>");
}

#[test]
fn test_accept_visits_operands_first() {
    struct Recorder {
        events: Vec<String>,
    }
    impl Visitor for Recorder {
        type Output = usize;
        fn visit_literal(&mut self, l: &Literal) -> usize {
            self.events.push(format!("literal {}", l.value));
            1
        }
        fn visit_column_reference(&mut self, c: &ColumnReference) -> usize {
            self.events.push(format!("column {}", c.column_index));
            1
        }
        fn enter_operation(&mut self, o: &Operation) {
            self.events.push(format!("enter {}", o.operator));
        }
        fn visit_operation(&mut self, o: &Operation, operands: Vec<usize>) -> usize {
            self.events.push(format!("{} {:?}", o.operator, operands));
            operands.iter().sum::<usize>() + 1
        }
    }
    let (e, root) = make_add_tree();
    let mut recorder = Recorder { events: vec![] };
    // The output counts the nodes in the tree.
    assert_eq!(e.accept(root, &mut recorder), 5);
    assert_eq!(
        recorder.events,
        vec![
            "enter mul",
            "enter add",
            "column 0",
            "column 1",
            "add [1, 1]",
            "literal 3",
            "mul [3, 1]",
        ]
    );
    assert_eq!(e.accept(NodeId(3), &mut recorder), 1);
}

#[test]
fn test_deep_expression_walk_and_display() {
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let mut acc = a;
    for _ in 0..200_000 {
        acc = e.operation(Operator::Identity, vec![acc]).unwrap();
    }
    struct Depth;
    impl Visitor for Depth {
        type Output = usize;
        fn visit_literal(&mut self, _: &Literal) -> usize {
            0
        }
        fn visit_column_reference(&mut self, _: &ColumnReference) -> usize {
            0
        }
        fn visit_operation(&mut self, _: &Operation, operands: Vec<usize>) -> usize {
            operands.into_iter().max().unwrap_or(0) + 1
        }
    }
    assert_eq!(e.accept(acc, &mut Depth), 200_000);
    let text = e.display(acc).to_string();
    assert_eq!(text.matches("identity(").count(), 200_000);
    assert!(text.ends_with("(left[0])))"));
}
