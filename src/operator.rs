//! defines the operators an expression can apply, how many operands each takes, and the rules
//! for the type an operator produces from its operand types.

use std::str::FromStr;

use crate::sql_type::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Binary arithmetic.
    Add,
    Sub,
    Mul,
    Div,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    // Comparison.
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    // Bitwise and logical.
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LogicalAnd,
    LogicalOr,
    // Unary.
    Identity,
    Sin,
    Cos,
    Tan,
    Sqrt,
    Exp,
    Log,
    Ceil,
    Floor,
    Abs,
    Not,
    CastToInt64,
    CastToUInt64,
    CastToFloat64,
}

const ALL_OPERATORS: [Operator; 33] = {
    use Operator::*;
    [
        Add, Sub, Mul, Div, TrueDiv, FloorDiv, Mod, Pow, Equal, NotEqual, Less, Greater,
        LessEqual, GreaterEqual, BitwiseAnd, BitwiseOr, BitwiseXor, LogicalAnd, LogicalOr,
        Identity, Sin, Cos, Tan, Sqrt, Exp, Log, Ceil, Floor, Abs, Not, CastToInt64,
        CastToUInt64, CastToFloat64,
    ]
};

impl Operator {
    /// the number of operands the operator consumes. The evaluator uses this to split the flat
    /// operand/result index list of a linear program back into instructions.
    pub fn arity(&self) -> usize {
        use Operator::*;
        match self {
            Add | Sub | Mul | Div | TrueDiv | FloorDiv | Mod | Pow | Equal | NotEqual | Less
            | Greater | LessEqual | GreaterEqual | BitwiseAnd | BitwiseOr | BitwiseXor
            | LogicalAnd | LogicalOr => 2,
            Identity | Sin | Cos | Tan | Sqrt | Exp | Log | Ceil | Floor | Abs | Not
            | CastToInt64 | CastToUInt64 | CastToFloat64 => 1,
        }
    }

    fn name(&self) -> &'static str {
        use Operator::*;
        match self {
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            TrueDiv => "true_div",
            FloorDiv => "floor_div",
            Mod => "mod",
            Pow => "pow",
            Equal => "equal",
            NotEqual => "not_equal",
            Less => "less",
            Greater => "greater",
            LessEqual => "less_equal",
            GreaterEqual => "greater_equal",
            BitwiseAnd => "bitwise_and",
            BitwiseOr => "bitwise_or",
            BitwiseXor => "bitwise_xor",
            LogicalAnd => "logical_and",
            LogicalOr => "logical_or",
            Identity => "identity",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Sqrt => "sqrt",
            Exp => "exp",
            Log => "log",
            Ceil => "ceil",
            Floor => "floor",
            Abs => "abs",
            Not => "not",
            CastToInt64 => "cast_to_int64",
            CastToUInt64 => "cast_to_uint64",
            CastToFloat64 => "cast_to_float64",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Operator {operator} takes {expected} operands but was given {actual}.")]
    ArityMismatch {
        operator: Operator,
        expected: usize,
        actual: usize,
    },
    #[error("Operator {operator} does not accept operands of type {data_type}.")]
    UnsupportedOperandType {
        operator: Operator,
        data_type: DataType,
    },
    #[error("Unknown operator: {0}.")]
    UnknownOperator(String),
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ALL_OPERATORS
            .iter()
            .find(|op| op.name() == lower)
            .copied()
            .ok_or(Error::UnknownOperator(lower))
    }
}

/// maps an operator and the types of its operands to the type of its result.
/// The linearizer only asks after it has checked that all operand types are identical.
pub trait TypeRegistry {
    fn return_type(&self, operator: Operator, operand_types: &[DataType])
        -> Result<DataType, Error>;
}

/// the built-in result type rules. Results never widen: an `int8 + int8` is an `int8`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeRegistry;

impl TypeRegistry for DefaultTypeRegistry {
    fn return_type(
        &self,
        operator: Operator,
        operand_types: &[DataType],
    ) -> Result<DataType, Error> {
        use Operator::*;
        if operand_types.len() != operator.arity() {
            return Err(Error::ArityMismatch {
                operator,
                expected: operator.arity(),
                actual: operand_types.len(),
            });
        }
        // All operand types are the same by now, so the first one stands for all of them.
        let t = operand_types[0];
        let unsupported = Err(Error::UnsupportedOperandType {
            operator,
            data_type: t,
        });
        match operator {
            Add | Mul | Div | FloorDiv | Mod if t.is_numeric() || t == DataType::Decimal128 => {
                Ok(t)
            }
            Sub if t.is_numeric() || t.is_timestamp() || t == DataType::Decimal128 => Ok(t),
            Pow if t.is_numeric() => Ok(t),
            TrueDiv if t.is_numeric() => Ok(DataType::Float64),
            Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual
                if t != DataType::Empty =>
            {
                Ok(DataType::Bool8)
            }
            BitwiseAnd | BitwiseOr | BitwiseXor if t.is_integer() => Ok(t),
            LogicalAnd | LogicalOr | Not if t == DataType::Bool8 => Ok(DataType::Bool8),
            Sin | Cos | Tan | Sqrt | Exp | Log | Ceil | Floor if t.is_floating_point() => Ok(t),
            Abs if t.is_signed_integer() || t.is_floating_point() => Ok(t),
            Identity if t != DataType::Empty => Ok(t),
            CastToInt64 if t.is_numeric() || t == DataType::Bool8 => Ok(DataType::Int64),
            CastToUInt64 if t.is_numeric() || t == DataType::Bool8 => Ok(DataType::UInt64),
            CastToFloat64 if t.is_numeric() || t == DataType::Bool8 => Ok(DataType::Float64),
            _ => unsupported,
        }
    }
}

#[test]
fn test_operator_names_and_arity() {
    for op in ALL_OPERATORS {
        assert_eq!(Operator::from_str(op.name()), Ok(op));
    }
    assert_eq!(ALL_OPERATORS.iter().filter(|op| op.arity() == 2).count(), 19);
    assert_eq!(Operator::CastToUInt64.arity(), 1);
    assert_eq!(Operator::from_str("TRUE_DIV"), Ok(Operator::TrueDiv));
    assert_eq!(
        Operator::from_str("frobnicate"),
        Err(Error::UnknownOperator("frobnicate".to_string()))
    );
}

#[test]
fn test_default_return_types() {
    use DataType::*;
    use Operator::*;
    struct Case {
        desc: &'static str,
        operator: Operator,
        operands: Vec<DataType>,
        expected: Result<DataType, Error>,
    }
    let cases = vec![
        Case {
            desc: "int32 + int32",
            operator: Add,
            operands: vec![Int32, Int32],
            expected: Ok(Int32),
        },
        Case {
            desc: "true division of integers is floating point",
            operator: TrueDiv,
            operands: vec![Int64, Int64],
            expected: Ok(Float64),
        },
        Case {
            desc: "comparison of strings",
            operator: Less,
            operands: vec![String, String],
            expected: Ok(Bool8),
        },
        Case {
            desc: "decimal addition keeps decimal",
            operator: Add,
            operands: vec![Decimal128, Decimal128],
            expected: Ok(Decimal128),
        },
        Case {
            desc: "timestamp difference",
            operator: Sub,
            operands: vec![TimestampSeconds, TimestampSeconds],
            expected: Ok(TimestampSeconds),
        },
        Case {
            desc: "timestamps do not add",
            operator: Add,
            operands: vec![TimestampDays, TimestampDays],
            expected: Err(Error::UnsupportedOperandType {
                operator: Add,
                data_type: TimestampDays,
            }),
        },
        Case {
            desc: "sin of integer",
            operator: Sin,
            operands: vec![Int32],
            expected: Err(Error::UnsupportedOperandType {
                operator: Sin,
                data_type: Int32,
            }),
        },
        Case {
            desc: "abs of unsigned",
            operator: Abs,
            operands: vec![UInt8],
            expected: Err(Error::UnsupportedOperandType {
                operator: Abs,
                data_type: UInt8,
            }),
        },
        Case {
            desc: "logical and of booleans",
            operator: LogicalAnd,
            operands: vec![Bool8, Bool8],
            expected: Ok(Bool8),
        },
        Case {
            desc: "bitwise and of floats",
            operator: BitwiseAnd,
            operands: vec![Float32, Float32],
            expected: Err(Error::UnsupportedOperandType {
                operator: BitwiseAnd,
                data_type: Float32,
            }),
        },
        Case {
            desc: "cast bool to float",
            operator: CastToFloat64,
            operands: vec![Bool8],
            expected: Ok(Float64),
        },
        Case {
            desc: "identity of string",
            operator: Identity,
            operands: vec![String],
            expected: Ok(String),
        },
        Case {
            desc: "binary operator given one operand",
            operator: Add,
            operands: vec![Int32],
            expected: Err(Error::ArityMismatch {
                operator: Add,
                expected: 2,
                actual: 1,
            }),
        },
        Case {
            desc: "unary operator given no operands",
            operator: Not,
            operands: vec![],
            expected: Err(Error::ArityMismatch {
                operator: Not,
                expected: 1,
                actual: 0,
            }),
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let actual = DefaultTypeRegistry.return_type(case.operator, &case.operands);
        assert_eq!(actual, case.expected);
    }
}
