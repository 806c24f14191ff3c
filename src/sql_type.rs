//! Defines the closed set of data types a column, literal or intermediate value can have,
//! and routines for conversion to and from string.
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// These are the types that an expression value can have.
/// Notes:
///   - `Empty` is not a storable type. It is reported as the output type of a program that has
///     no data references at all.
///   - `String` is variable width, so it can be read from a column or written to the output column,
///     but never held in an intermediate slot.
pub enum DataType {
    Empty,
    Bool8,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    TimestampDays,
    TimestampSeconds,
    TimestampMilliseconds,
    Decimal128,
    String,
}

impl DataType {
    /// is true for types whose values all occupy the same number of bytes.
    pub fn is_fixed_width(&self) -> bool {
        self.size_of().is_some()
    }

    /// returns the width in bytes of one value, or `None` if the type is not fixed width.
    pub fn size_of(&self) -> Option<usize> {
        use DataType::*;
        match self {
            Empty | String => None,
            Bool8 | Int8 | UInt8 => Some(1),
            Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Float32 | TimestampDays => Some(4),
            Int64 | UInt64 | Float64 | TimestampSeconds | TimestampMilliseconds => Some(8),
            Decimal128 => Some(16),
        }
    }

    pub fn is_integer(&self) -> bool {
        use DataType::*;
        matches!(
            self,
            Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64
        )
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// integers and floats. Booleans, timestamps and decimals are not numeric here.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            DataType::TimestampDays | DataType::TimestampSeconds | DataType::TimestampMilliseconds
        )
    }

    fn name(&self) -> &'static str {
        use DataType::*;
        match self {
            Empty => "empty",
            Bool8 => "bool8",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt32 => "uint32",
            UInt64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
            TimestampDays => "timestamp_days",
            TimestampSeconds => "timestamp_seconds",
            TimestampMilliseconds => "timestamp_milliseconds",
            Decimal128 => "decimal128",
            String => "string",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unable to parse DataType from name: {0}.")]
    ParseDataTypeError(String),
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DataType::*;
        match s.to_lowercase().as_str() {
            "bool8" | "bool" => Ok(Bool8),
            "int8" => Ok(Int8),
            "int16" => Ok(Int16),
            "int32" | "int" => Ok(Int32),
            "int64" => Ok(Int64),
            "uint8" => Ok(UInt8),
            "uint16" => Ok(UInt16),
            "uint32" => Ok(UInt32),
            "uint64" => Ok(UInt64),
            "float32" => Ok(Float32),
            "float64" | "double" => Ok(Float64),
            "timestamp_days" => Ok(TimestampDays),
            "timestamp_seconds" => Ok(TimestampSeconds),
            "timestamp_milliseconds" => Ok(TimestampMilliseconds),
            "decimal128" => Ok(Decimal128),
            "string" | "text" => Ok(String),
            // No value or column can have the empty type.
            x => Err(Error::ParseDataTypeError(x.to_string())),
        }
    }
}

#[test]
fn test_fixed_width() {
    use DataType::*;
    let cases = vec![
        (Bool8, Some(1)),
        (Int16, Some(2)),
        (Float32, Some(4)),
        (TimestampDays, Some(4)),
        (UInt64, Some(8)),
        (TimestampMilliseconds, Some(8)),
        (Decimal128, Some(16)),
        (String, None),
        (Empty, None),
    ];
    for (t, size) in cases {
        println!("Case: {}", t);
        assert_eq!(t.size_of(), size);
        assert_eq!(t.is_fixed_width(), size.is_some());
    }
}

#[test]
fn test_parse_data_type() {
    use DataType::*;
    let cases = vec![
        ("int32", Ok(Int32)),
        ("INT64", Ok(Int64)),
        ("Float64", Ok(Float64)),
        ("timestamp_days", Ok(TimestampDays)),
        ("text", Ok(String)),
        ("empty", Err(Error::ParseDataTypeError("empty".to_string()))),
        ("varchar", Err(Error::ParseDataTypeError("varchar".to_string()))),
    ];
    for (input, expected) in cases {
        println!("Case: {}", input);
        assert_eq!(DataType::from_str(input), expected);
    }
}

