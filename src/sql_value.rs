//! Defines an enum of all the possible values that a literal can have.

use crate::sql_type::DataType;

#[derive(Debug, Clone, PartialEq)]
/// can hold any value that a literal node carries into the literal pool.
/// Each variant corresponds to exactly one `DataType`; `Null` carries the type of the missing value.
pub enum Scalar {
    Bool8(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    TimestampDays(i32),
    TimestampSeconds(i64),
    TimestampMilliseconds(i64),
    Decimal128(i128),
    String(String),
    Null(DataType),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Bool8(_) => DataType::Bool8,
            Scalar::Int8(_) => DataType::Int8,
            Scalar::Int16(_) => DataType::Int16,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::UInt8(_) => DataType::UInt8,
            Scalar::UInt16(_) => DataType::UInt16,
            Scalar::UInt32(_) => DataType::UInt32,
            Scalar::UInt64(_) => DataType::UInt64,
            Scalar::Float32(_) => DataType::Float32,
            Scalar::Float64(_) => DataType::Float64,
            Scalar::TimestampDays(_) => DataType::TimestampDays,
            Scalar::TimestampSeconds(_) => DataType::TimestampSeconds,
            Scalar::TimestampMilliseconds(_) => DataType::TimestampMilliseconds,
            Scalar::Decimal128(_) => DataType::Decimal128,
            Scalar::String(_) => DataType::String,
            Scalar::Null(t) => *t,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Scalar::Null(_))
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool8(x) => x.fmt(f),
            Scalar::Int8(x) => x.fmt(f),
            Scalar::Int16(x) => x.fmt(f),
            Scalar::Int32(x) => x.fmt(f),
            Scalar::Int64(x) => x.fmt(f),
            Scalar::UInt8(x) => x.fmt(f),
            Scalar::UInt16(x) => x.fmt(f),
            Scalar::UInt32(x) => x.fmt(f),
            Scalar::UInt64(x) => x.fmt(f),
            Scalar::Float32(x) => x.fmt(f),
            Scalar::Float64(x) => x.fmt(f),
            Scalar::TimestampDays(x) => x.fmt(f),
            Scalar::TimestampSeconds(x) => x.fmt(f),
            Scalar::TimestampMilliseconds(x) => x.fmt(f),
            Scalar::Decimal128(x) => x.fmt(f),
            Scalar::String(x) => write!(f, "'{}'", x),
            Scalar::Null(_) => "null".fmt(f),
        }
    }
}

#[test]
fn test_scalar_data_type() {
    let cases = vec![
        (Scalar::Bool8(true), DataType::Bool8),
        (Scalar::Int32(-4), DataType::Int32),
        (Scalar::UInt64(4), DataType::UInt64),
        (Scalar::Float64(0.5), DataType::Float64),
        (Scalar::TimestampDays(18_000), DataType::TimestampDays),
        (Scalar::String("hi".to_string()), DataType::String),
        (Scalar::Null(DataType::Int16), DataType::Int16),
    ];
    for (value, expected) in cases {
        println!("Case: {}", value);
        assert_eq!(value.data_type(), expected);
        assert_eq!(value.is_valid(), !matches!(value, Scalar::Null(_)));
    }
}
