//! `parser` contains generated parsing routines for the expression syntax and tests on them.

use pest::pratt_parser::PrattParser;

#[allow(unused_imports)]
use pest::Parser; // This needs to be in scope for the next statements to work.
#[derive(pest_derive::Parser)]
#[grammar = "expr.pest"]
pub struct ExprParser;

// From: https://pest.rs/book/examples/calculator.html, MIT,Apache2.0 licenses.
lazy_static::lazy_static! {
    pub static ref PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::{Assoc::*, Op};
        use Rule::*;

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(logical_or, Left))
            .op(Op::infix(logical_and, Left))
            .op(Op::infix(bitwise_or, Left))
            .op(Op::infix(bitwise_xor, Left))
            .op(Op::infix(bitwise_and, Left))
            .op(Op::infix(equal, Left) | Op::infix(not_equal, Left))
            .op(Op::infix(less, Left)
                | Op::infix(greater, Left)
                | Op::infix(less_equal, Left)
                | Op::infix(greater_equal, Left))
            .op(Op::infix(add, Left) | Op::infix(subtract, Left))
            .op(Op::infix(multiply, Left) | Op::infix(divide, Left) | Op::infix(modulo, Left))
    };
}

#[test]
fn test_parse_literals() {
    let cases = vec![
        "1:int32",
        "-1000000000000:int64",
        "1.01:float64",
        "'hi':string",
        "'':string",
        "true:bool8",
        "FALSE:bool8",
        "null:int16",
        "NuLl:float32",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(ExprParser::parse(Rule::literal, case).is_ok());
    }
}

#[test]
fn test_not_parse_invalid_literals() {
    let cases = vec!["1", "1 : int32", "\"hi\":string", "'hi'", ":int32", "1.:float64"];
    for case in cases {
        println!("Case: {}", case);
        assert!(ExprParser::parse(Rule::program, case).is_err());
    }
}

#[test]
fn test_parse_column_refs() {
    let cases = vec!["left[0]", "RIGHT[12]", "output[0]"];
    for case in cases {
        println!("Case: {}", case);
        assert!(ExprParser::parse(Rule::program, case).is_ok());
    }
    let bad = vec!["left [0]", "left[-1]", "middle[0]", "left[]"];
    for case in bad {
        println!("Case: {}", case);
        assert!(ExprParser::parse(Rule::program, case).is_err());
    }
}

#[test]
fn test_parse_expr() {
    let cases = vec![
        "add(left[0], left[1])",
        "add(add(left[0], left[1]), 3:int32)",
        "left[0] + 2:int32 * right[1]",
        "(left[0] + 2:int32) * right[1]",
        "left[0]-1:int32",
        "left[0] <= left[1] && left[2] != 0:int64 || not(left[3])",
        "sqrt ( left[0] )",
        "identity()",
    ];
    for case in cases {
        println!("Case: {}", case);
        match ExprParser::parse(Rule::program, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_expr() {
    let cases = vec![
        "",
        "add(left[0],)",
        "left[0] +",
        "(left[0]",
        "left[0] left[1]",
        "1:int32 === 1:int32",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(ExprParser::parse(Rule::program, case).is_err());
    }
}
