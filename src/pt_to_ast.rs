//! `pt_to_ast` has routines for converting parse trees to ASTs for scalar expressions.
//! A Pest parse tree has one enum for all possible terminals and non-terminals.
//! Our AST is an arena of typed nodes, and it discards lexical detail like case, whitespace and
//! parentheses.

use std::cell::RefCell;
use std::str::FromStr;

use pest::iterators::{Pair, Pairs};
use pest::Parser;

use crate::ast::{self, Expression, NodeId, TableSource};
use crate::operator::{self, Operator};
use crate::parser::{ExprParser, Rule, PRATT_PARSER};
use crate::sql_type::{self, DataType};
use crate::sql_value::Scalar;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error(transparent)]
    Operator(#[from] operator::Error),
    #[error(transparent)]
    DataType(#[from] sql_type::Error),
    #[error("Literal {value} is not a valid {data_type}.")]
    InvalidLiteral { value: String, data_type: DataType },
    #[error("Column index {0} is too large.")]
    InvalidColumnIndex(String),
    #[error(transparent)]
    Ast(#[from] ast::Error),
}

/// parses `text` into a new expression, returning it along with its root node.
pub fn parse_expression(text: &str) -> Result<(Expression, NodeId), Error> {
    let program = ExprParser::parse(Rule::program, text)
        .map_err(|e| Error::Syntax(Box::new(e)))?
        .next()
        .expect("a successful parse always yields the program rule");
    let expr = program
        .into_inner()
        .next()
        .expect("a program always contains one expression");
    let arena = RefCell::new(Expression::new());
    let root = build_expr(expr.into_inner(), &arena)?;
    Ok((arena.into_inner(), root))
}

fn build_expr(pairs: Pairs<Rule>, arena: &RefCell<Expression>) -> Result<NodeId, Error> {
    PRATT_PARSER
        .map_primary(|primary| build_primary(primary, arena))
        .map_infix(|lhs, op, rhs| {
            let operator = infix_operator(op.as_rule());
            let operands = vec![lhs?, rhs?];
            Ok(arena.borrow_mut().operation(operator, operands)?)
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>, arena: &RefCell<Expression>) -> Result<NodeId, Error> {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner(), arena),
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().map_or("", |p| p.as_str());
            let operator = Operator::from_str(name)?;
            let operands = inner
                .map(|arg| build_expr(arg.into_inner(), arena))
                .collect::<Result<Vec<NodeId>, Error>>()?;
            Ok(arena.borrow_mut().operation(operator, operands)?)
        }
        Rule::column_ref => {
            let mut inner = pair.into_inner();
            let side = inner.next().map_or("", |p| p.as_str());
            let index = inner.next().map_or("", |p| p.as_str());
            let table_source = match side.to_lowercase().as_str() {
                "left" => TableSource::Left,
                "right" => TableSource::Right,
                "output" => TableSource::Output,
                s => unreachable!("grammar only allows known table sides, found {}", s),
            };
            let column_index = usize::from_str(index)
                .map_err(|_| Error::InvalidColumnIndex(index.to_string()))?;
            Ok(arena.borrow_mut().column(table_source, column_index))
        }
        Rule::literal => {
            let value = parse_literal_from_rule(pair)?;
            Ok(arena.borrow_mut().literal(value))
        }
        rule => unreachable!("build_primary expected a primary, found {:?}", rule),
    }
}

fn infix_operator(rule: Rule) -> Operator {
    match rule {
        Rule::logical_or => Operator::LogicalOr,
        Rule::logical_and => Operator::LogicalAnd,
        Rule::bitwise_or => Operator::BitwiseOr,
        Rule::bitwise_xor => Operator::BitwiseXor,
        Rule::bitwise_and => Operator::BitwiseAnd,
        Rule::equal => Operator::Equal,
        Rule::not_equal => Operator::NotEqual,
        Rule::less => Operator::Less,
        Rule::greater => Operator::Greater,
        Rule::less_equal => Operator::LessEqual,
        Rule::greater_equal => Operator::GreaterEqual,
        Rule::add => Operator::Add,
        Rule::subtract => Operator::Sub,
        Rule::multiply => Operator::Mul,
        Rule::divide => Operator::Div,
        Rule::modulo => Operator::Mod,
        rule => unreachable!("infix_operator expected an infix operator, found {:?}", rule),
    }
}

fn parse_literal_from_rule(pair: Pair<Rule>) -> Result<Scalar, Error> {
    let mut inner = pair.into_inner();
    let (value, type_name) = match (inner.next(), inner.next()) {
        (Some(v), Some(t)) => (v, t),
        _ => unreachable!("a literal is always a value and a type name"),
    };
    let data_type = DataType::from_str(type_name.as_str())?;
    let invalid = || Error::InvalidLiteral {
        value: value.as_str().to_string(),
        data_type,
    };
    match value.as_rule() {
        Rule::null_literal => Ok(Scalar::Null(data_type)),
        Rule::true_literal if data_type == DataType::Bool8 => Ok(Scalar::Bool8(true)),
        Rule::false_literal if data_type == DataType::Bool8 => Ok(Scalar::Bool8(false)),
        Rule::integer_literal => integer_scalar(value.as_str(), data_type).ok_or_else(invalid),
        Rule::decimal_literal => match data_type {
            // Danger: floating point conversion.
            DataType::Float32 => value.as_str().parse().map(Scalar::Float32).map_err(|_| invalid()),
            DataType::Float64 => value.as_str().parse().map(Scalar::Float64).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        Rule::single_quoted_string if data_type == DataType::String => {
            let text = value.clone().into_inner().next().map_or("", |p| p.as_str());
            Ok(Scalar::String(text.to_string()))
        }
        _ => Err(invalid()),
    }
}

fn integer_scalar(text: &str, data_type: DataType) -> Option<Scalar> {
    use DataType::*;
    match data_type {
        Int8 => text.parse().ok().map(Scalar::Int8),
        Int16 => text.parse().ok().map(Scalar::Int16),
        Int32 => text.parse().ok().map(Scalar::Int32),
        Int64 => text.parse().ok().map(Scalar::Int64),
        UInt8 => text.parse().ok().map(Scalar::UInt8),
        UInt16 => text.parse().ok().map(Scalar::UInt16),
        UInt32 => text.parse().ok().map(Scalar::UInt32),
        UInt64 => text.parse().ok().map(Scalar::UInt64),
        Float32 => text.parse().ok().map(Scalar::Float32),
        Float64 => text.parse().ok().map(Scalar::Float64),
        TimestampDays => text.parse().ok().map(Scalar::TimestampDays),
        TimestampSeconds => text.parse().ok().map(Scalar::TimestampSeconds),
        TimestampMilliseconds => text.parse().ok().map(Scalar::TimestampMilliseconds),
        Decimal128 => text.parse().ok().map(Scalar::Decimal128),
        Bool8 | String | Empty => None,
    }
}

#[test]
fn test_parsing_literals() {
    let cases = vec![
        ("1:int32", Scalar::Int32(1)),
        ("-7:int8", Scalar::Int8(-7)),
        ("65535:uint16", Scalar::UInt16(65535)),
        ("2:float64", Scalar::Float64(2.0)),
        ("0.5:float32", Scalar::Float32(0.5)),
        ("18000:timestamp_days", Scalar::TimestampDays(18000)),
        ("TRUE:bool8", Scalar::Bool8(true)),
        ("false:bool", Scalar::Bool8(false)),
        ("'it works':string", Scalar::String("it works".to_string())),
        ("null:uint64", Scalar::Null(DataType::UInt64)),
    ];
    for (input, expected) in cases {
        println!("Input: {}", input);
        let (e, root) = parse_expression(input).unwrap();
        assert_eq!(e.len(), 1);
        assert_eq!(e.node(root).unwrap().as_literal().unwrap().value, expected);
    }
}

#[test]
fn test_parsing_invalid_literals() {
    let cases = vec![
        ("300:int8", "300", DataType::Int8),
        ("-1:uint32", "-1", DataType::UInt32),
        ("1.5:int64", "1.5", DataType::Int64),
        ("true:int32", "true", DataType::Int32),
        ("'x':bool8", "'x'", DataType::Bool8),
        ("5:string", "5", DataType::String),
    ];
    for (input, value, data_type) in cases {
        println!("Input: {}", input);
        match parse_expression(input) {
            Err(Error::InvalidLiteral {
                value: v,
                data_type: t,
            }) => {
                assert_eq!(v, value);
                assert_eq!(t, data_type);
            }
            other => panic!("expected InvalidLiteral, got {:?}", other),
        }
    }
}

#[test]
fn test_parse_expression_structure() {
    let cases = vec![
        ("add(left[0], left[1])", "add(left[0], left[1])"),
        ("left[0] + left[1]", "add(left[0], left[1])"),
        (
            "left[0] + 2:int32 * right[1]",
            "add(left[0], mul(2:int32, right[1]))",
        ),
        (
            "(left[0] + 2:int32) * right[1]",
            "mul(add(left[0], 2:int32), right[1])",
        ),
        ("left[0] - left[1] - left[2]", "sub(sub(left[0], left[1]), left[2])"),
        (
            "left[0] < 1:int32 || left[1] == 2:int32 && left[2] > 3:int32",
            "logical_or(less(left[0], 1:int32), logical_and(equal(left[1], 2:int32), greater(left[2], 3:int32)))",
        ),
        (
            "left[0] | left[1] ^ left[2] & left[3]",
            "bitwise_or(left[0], bitwise_xor(left[1], bitwise_and(left[2], left[3])))",
        ),
        ("SQRT(output[0] % 2.0:float64)", "sqrt(mod(output[0], 2:float64))"),
        ("identity()", "identity()"),
    ];
    for (input, expected) in cases {
        println!("Input: {}", input);
        let (e, root) = parse_expression(input).unwrap();
        assert_eq!(e.display(root).to_string(), expected);
    }
}

#[test]
fn test_parse_expression_errors() {
    assert!(matches!(parse_expression("add(left[0]"), Err(Error::Syntax(_))));
    assert!(matches!(
        parse_expression("frob(left[0])"),
        Err(Error::Operator(operator::Error::UnknownOperator(_)))
    ));
    assert!(matches!(
        parse_expression("1:int128"),
        Err(Error::DataType(sql_type::Error::ParseDataTypeError(_)))
    ));
    assert!(matches!(
        parse_expression("left[99999999999999999999999]"),
        Err(Error::InvalidColumnIndex(_))
    ));
}
