//! Decoded values produced by running a codec over a byte stream.

use indexmap::IndexMap;

/// A value decoded from (or suitable for encoding into) binary data.
///
/// Integers are widened to 64 bits at the value level; the codec that
/// produced a value knows its storage width and enforces range on encode.
/// Struct keys keep their schema declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Short shape name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U64(_) => "unsigned integer",
            Value::I64(_) => "signed integer",
            Value::F64(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// Interprets this value as an element count. Only non-negative integers
    /// qualify; floats and bools never do.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Value::U64(n) => usize::try_from(*n).ok(),
            Value::I64(n) => usize::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Field lookup on struct values; `None` for any other shape.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Struct(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_count() {
        assert_eq!(Value::U64(2).as_count(), Some(2));
        assert_eq!(Value::I64(7).as_count(), Some(7));
        assert_eq!(Value::I64(-1).as_count(), None);
        assert_eq!(Value::F64(2.0).as_count(), None);
        assert_eq!(Value::Bool(true).as_count(), None);
    }

    #[test]
    fn test_get_on_non_struct() {
        assert_eq!(Value::U64(1).get("x"), None);
    }
}
