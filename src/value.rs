use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// A typed constant value carried by a `Constant` expression node.
///
/// This is the closed set of primitive types the wire protocol can express.
/// The integer widths are kept distinct because the canonical rendering
/// differs per width (`L` suffix for 64-bit values, plain digits for the
/// narrower ones), as do the literal forms the parser produces.
///
/// # Examples
///
/// ```
/// use odata_query::Value;
///
/// let count = Value::Int32(42);
/// let name = Value::String("Alice".to_string());
/// let price = Value::Double(12.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    String(String),
    Binary(Vec<u8>),
    Guid(Uuid),
    /// An instant normalized to UTC (`datetime'...'` literal).
    DateTime(DateTime<Utc>),
    /// An instant with an explicit offset (`datetimeoffset'...'` literal).
    DateTimeOffset(DateTime<FixedOffset>),
    /// A time-of-day value (`time'...'` literal).
    Time(NaiveTime),
}

/// Type tag naming a [`Value`] primitive kind, used by `Convert` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    Char,
    String,
    Binary,
    Guid,
    DateTime,
    DateTimeOffset,
    Time,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::SByte(_) => ValueKind::SByte,
            Value::Int16(_) => ValueKind::Int16,
            Value::UInt16(_) => ValueKind::UInt16,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Single(_) => ValueKind::Single,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Char(_) => ValueKind::Char,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::Guid(_) => ValueKind::Guid,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::DateTimeOffset(_) => ValueKind::DateTimeOffset,
            Value::Time(_) => ValueKind::Time,
        }
    }
}

/// Converts a constant value into a JSON value.
///
/// This is the bridge the table layer uses when a constant has to travel in
/// a request body rather than a query string. Decimals are emitted as
/// strings to keep their precision, binary data as uppercase hex, and
/// dates/times as ISO-8601 strings.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Byte(v) => json!(v),
        Value::SByte(v) => json!(v),
        Value::Int16(v) => json!(v),
        Value::UInt16(v) => json!(v),
        Value::Int32(v) => json!(v),
        Value::UInt32(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::UInt64(v) => json!(v),
        Value::Single(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Decimal(d) => json!(d.to_string()),
        Value::Char(c) => json!(c.to_string()),
        Value::String(s) => json!(s),
        Value::Binary(bytes) => json!(hex::encode_upper(bytes)),
        Value::Guid(g) => json!(g.to_string()),
        Value::DateTime(dt) => json!(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::DateTimeOffset(dt) => json!(dt.to_rfc3339()),
        Value::Time(t) => json!(t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_scalars() {
        assert_eq!(to_json(&Value::Null), serde_json::Value::Null);
        assert_eq!(to_json(&Value::Int32(7)), json!(7));
        assert_eq!(to_json(&Value::Bool(true)), json!(true));
        assert_eq!(to_json(&Value::String("hi".to_string())), json!("hi"));
    }

    #[test]
    fn test_to_json_preserves_decimal_precision() {
        let d = Decimal::new(123456789012345678, 9);
        assert_eq!(to_json(&Value::Decimal(d)), json!("123456789.012345678"));
    }

    #[test]
    fn test_to_json_binary_is_hex() {
        assert_eq!(to_json(&Value::Binary(vec![0x0F, 0xA0])), json!("0FA0"));
    }
}
