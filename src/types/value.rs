use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::types::error::{DatabaseError, Result};
use crate::types::TypeCode;

// One-byte value tags. Codes below 0x04 are NULLs of widths 1/2/4/8; codes
// 0x04..=0x0B are the fixed-width types; any code >= 0x0C is TEXT of length
// `code - 0x0C`.
pub const ONE_BYTE_NULL: TypeCode = 0x00;
pub const TWO_BYTE_NULL: TypeCode = 0x01;
pub const FOUR_BYTE_NULL: TypeCode = 0x02;
pub const EIGHT_BYTE_NULL: TypeCode = 0x03;
pub const TINY_INT: TypeCode = 0x04;
pub const SMALL_INT: TypeCode = 0x05;
pub const INT: TypeCode = 0x06;
pub const BIG_INT: TypeCode = 0x07;
pub const REAL: TypeCode = 0x08;
pub const DOUBLE: TypeCode = 0x09;
pub const DATE_TIME: TypeCode = 0x0A;
pub const DATE: TypeCode = 0x0B;
pub const TEXT: TypeCode = 0x0C;

const DATA_TYPE_SIZE: [u16; 12] = [1, 2, 4, 8, 1, 2, 4, 8, 4, 8, 8, 8];

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serialized width in bytes of a value carrying the given type code.
pub fn type_code_size(code: TypeCode) -> u16 {
    if code >= TEXT {
        (code - TEXT) as u16
    } else {
        DATA_TYPE_SIZE[code as usize]
    }
}

pub fn is_null_code(code: TypeCode) -> bool {
    code <= EIGHT_BYTE_NULL
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDataType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    DateTime,
    Date,
    Text,
}

impl SchemaDataType {
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "TINYINT" => Some(SchemaDataType::TinyInt),
            "SMALLINT" => Some(SchemaDataType::SmallInt),
            "INT" | "INTEGER" => Some(SchemaDataType::Int),
            "BIGINT" => Some(SchemaDataType::BigInt),
            "REAL" => Some(SchemaDataType::Real),
            "DOUBLE" => Some(SchemaDataType::Double),
            "DATETIME" => Some(SchemaDataType::DateTime),
            "DATE" => Some(SchemaDataType::Date),
            "TEXT" => Some(SchemaDataType::Text),
            _ => None,
        }
    }

    pub fn as_sql_name(&self) -> &'static str {
        match self {
            SchemaDataType::TinyInt => "TINYINT",
            SchemaDataType::SmallInt => "SMALLINT",
            SchemaDataType::Int => "INT",
            SchemaDataType::BigInt => "BIGINT",
            SchemaDataType::Real => "REAL",
            SchemaDataType::Double => "DOUBLE",
            SchemaDataType::DateTime => "DATETIME",
            SchemaDataType::Date => "DATE",
            SchemaDataType::Text => "TEXT",
        }
    }

    /// Type code of a non-null value of this schema type. TEXT codes also
    /// carry the byte length; see [`type_code_for`].
    pub fn fixed_code(&self) -> TypeCode {
        match self {
            SchemaDataType::TinyInt => TINY_INT,
            SchemaDataType::SmallInt => SMALL_INT,
            SchemaDataType::Int => INT,
            SchemaDataType::BigInt => BIG_INT,
            SchemaDataType::Real => REAL,
            SchemaDataType::Double => DOUBLE,
            SchemaDataType::DateTime => DATE_TIME,
            SchemaDataType::Date => DATE,
            SchemaDataType::Text => TEXT,
        }
    }

    /// Narrowest null code matching this type's width. TEXT has no fixed
    /// width, so a TEXT null compresses all the way down to one byte.
    pub fn null_code(&self) -> TypeCode {
        match self {
            SchemaDataType::TinyInt | SchemaDataType::Text => ONE_BYTE_NULL,
            SchemaDataType::SmallInt => TWO_BYTE_NULL,
            SchemaDataType::Int | SchemaDataType::Real => FOUR_BYTE_NULL,
            SchemaDataType::BigInt
            | SchemaDataType::Double
            | SchemaDataType::DateTime
            | SchemaDataType::Date => EIGHT_BYTE_NULL,
        }
    }
}

impl fmt::Display for SchemaDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    // Unix seconds, UTC
    DateTime(i64),
    Date(i64),
    Text(String),
}

/// Derive the per-value type code: the schema code for fixed types,
/// `0x0C + len` for TEXT, the narrowest matching null width for NULL.
pub fn type_code_for(data_type: SchemaDataType, value: &Value) -> Result<TypeCode> {
    match value {
        Value::Null => Ok(data_type.null_code()),
        Value::Text(s) => {
            if s.len() > (u8::MAX - TEXT) as usize {
                return Err(DatabaseError::CorruptedTable {
                    reason: format!("TEXT value of {} bytes exceeds the cell format", s.len()),
                });
            }
            Ok(TEXT + s.len() as u8)
        }
        _ => Ok(data_type.fixed_code()),
    }
}

/// Encode a value into its on-disk form: big-endian for multi-byte fixed
/// types, byte-reversed for TEXT, zero bytes for NULL widths.
pub fn value_to_bytes(code: TypeCode, value: &Value) -> Result<Vec<u8>> {
    let bytes = match (code, value) {
        (c, Value::Null) if is_null_code(c) => vec![0u8; type_code_size(c) as usize],
        (TINY_INT, Value::TinyInt(v)) => v.to_be_bytes().to_vec(),
        (SMALL_INT, Value::SmallInt(v)) => v.to_be_bytes().to_vec(),
        (INT, Value::Int(v)) => v.to_be_bytes().to_vec(),
        (BIG_INT, Value::BigInt(v)) => v.to_be_bytes().to_vec(),
        (REAL, Value::Real(v)) => v.to_be_bytes().to_vec(),
        (DOUBLE, Value::Double(v)) => v.to_be_bytes().to_vec(),
        (DATE_TIME, Value::DateTime(v)) => v.to_be_bytes().to_vec(),
        (DATE, Value::Date(v)) => v.to_be_bytes().to_vec(),
        (c, Value::Text(s)) if c >= TEXT => {
            let mut reversed = s.as_bytes().to_vec();
            reversed.reverse();
            reversed
        }
        _ => {
            return Err(DatabaseError::CorruptedTable {
                reason: format!("value {:?} does not match type code {:#04x}", value, code),
            })
        }
    };
    Ok(bytes)
}

/// Decode the on-disk form back into a value.
pub fn bytes_to_value(code: TypeCode, bytes: &[u8]) -> Result<Value> {
    let expected = type_code_size(code) as usize;
    if bytes.len() != expected {
        return Err(DatabaseError::CorruptedTable {
            reason: format!(
                "type code {:#04x} expects {} bytes, got {}",
                code,
                expected,
                bytes.len()
            ),
        });
    }

    let value = match code {
        ONE_BYTE_NULL | TWO_BYTE_NULL | FOUR_BYTE_NULL | EIGHT_BYTE_NULL => Value::Null,
        TINY_INT => Value::TinyInt(i8::from_be_bytes([bytes[0]])),
        SMALL_INT => Value::SmallInt(i16::from_be_bytes([bytes[0], bytes[1]])),
        INT => Value::Int(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        BIG_INT => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::BigInt(i64::from_be_bytes(buf))
        }
        REAL => Value::Real(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        DOUBLE => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::Double(f64::from_be_bytes(buf))
        }
        DATE_TIME => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::DateTime(i64::from_be_bytes(buf))
        }
        DATE => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::Date(i64::from_be_bytes(buf))
        }
        _ => {
            let mut reversed = bytes.to_vec();
            reversed.reverse();
            let text = String::from_utf8(reversed).map_err(|_| DatabaseError::CorruptedTable {
                reason: "TEXT payload is not valid UTF-8".to_string(),
            })?;
            Value::Text(text)
        }
    };
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorType {
    Equal,
    Unequal,
    Larger,
    Smaller,
    NotLarger,
    NotSmaller,
}

fn compare_ordered<T: PartialOrd>(lhs: &T, rhs: &T, op: OperatorType) -> bool {
    match op {
        OperatorType::Equal => lhs == rhs,
        OperatorType::Unequal => lhs != rhs,
        OperatorType::Larger => lhs > rhs,
        OperatorType::Smaller => lhs < rhs,
        OperatorType::NotLarger => lhs <= rhs,
        OperatorType::NotSmaller => lhs >= rhs,
    }
}

/// Compare two decoded values. A NULL on either side never satisfies any
/// operator, so NULLs never pass a WHERE clause.
pub fn compare(
    lhs: &Value,
    rhs: &Value,
    lhs_code: TypeCode,
    rhs_code: TypeCode,
    op: OperatorType,
) -> bool {
    if is_null_code(lhs_code) || is_null_code(rhs_code) {
        return false;
    }

    match (lhs, rhs) {
        (Value::TinyInt(a), Value::TinyInt(b)) => compare_ordered(a, b, op),
        (Value::SmallInt(a), Value::SmallInt(b)) => compare_ordered(a, b, op),
        (Value::Int(a), Value::Int(b)) => compare_ordered(a, b, op),
        (Value::BigInt(a), Value::BigInt(b)) => compare_ordered(a, b, op),
        (Value::Real(a), Value::Real(b)) => compare_ordered(a, b, op),
        (Value::Double(a), Value::Double(b)) => compare_ordered(a, b, op),
        // Date and datetime compare as time instants
        (Value::DateTime(a), Value::DateTime(b)) => compare_ordered(a, b, op),
        (Value::Date(a), Value::Date(b)) => compare_ordered(a, b, op),
        (Value::Text(a), Value::Text(b)) => compare_ordered(a, b, op),
        _ => false,
    }
}

/// Parse a SQL literal string into a value of the given schema type.
pub fn value_from_str(data_type: SchemaDataType, text: &str) -> Result<Value> {
    let mismatch = |expected: SchemaDataType| DatabaseError::TypeMismatch {
        column: String::new(),
        expected: expected.as_sql_name().to_string(),
        actual: text.to_string(),
    };

    let value = match data_type {
        SchemaDataType::TinyInt => {
            Value::TinyInt(text.parse().map_err(|_| mismatch(data_type))?)
        }
        SchemaDataType::SmallInt => {
            Value::SmallInt(text.parse().map_err(|_| mismatch(data_type))?)
        }
        SchemaDataType::Int => Value::Int(text.parse().map_err(|_| mismatch(data_type))?),
        SchemaDataType::BigInt => Value::BigInt(text.parse().map_err(|_| mismatch(data_type))?),
        SchemaDataType::Real => Value::Real(text.parse().map_err(|_| mismatch(data_type))?),
        SchemaDataType::Double => Value::Double(text.parse().map_err(|_| mismatch(data_type))?),
        SchemaDataType::DateTime => {
            let parsed = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
                .map_err(|_| mismatch(data_type))?;
            Value::DateTime(parsed.and_utc().timestamp())
        }
        SchemaDataType::Date => {
            let parsed =
                NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| mismatch(data_type))?;
            // Midnight is always a valid time of day
            let midnight = parsed.and_hms_opt(0, 0, 0).unwrap();
            Value::Date(midnight.and_utc().timestamp())
        }
        SchemaDataType::Text => Value::Text(text.to_string()),
    };
    Ok(value)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::DateTime(secs) => match DateTime::<Utc>::from_timestamp(*secs, 0) {
                Some(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
                None => write!(f, "INVALID_DATETIME({})", secs),
            },
            Value::Date(secs) => match DateTime::<Utc>::from_timestamp(*secs, 0) {
                Some(dt) => write!(f, "{}", dt.format(DATE_FORMAT)),
                None => write!(f, "INVALID_DATE({})", secs),
            },
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
