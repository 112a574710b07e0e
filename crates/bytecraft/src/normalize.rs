//! Converts decoded [Value]s into JSON values safe for text serialization.

use serde_json::{Map, Number};

use crate::value::Value;

/// Normalizes a decoded value for serialization. Deterministic and total:
/// this never fails.
///
/// - structs become objects, keys in encounter order, bookkeeping keys
///   (leading underscore) dropped; the drop applies to every mapping,
///   bitfield flag maps included, so flags meant to appear in output must
///   not be named with a leading underscore
/// - arrays recurse element-wise
/// - byte blobs become lowercase hex strings
/// - scalars pass through; a float JSON cannot represent (NaN, infinity)
///   falls back to its text rendering
pub fn normalize(value: &Value) -> serde_json::Value {
    match value {
        Value::Struct(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                if key.starts_with('_') {
                    continue;
                }
                out.insert(key.clone(), normalize(v));
            }
            serde_json::Value::Object(out)
        }
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(normalize).collect())
        }
        Value::Bytes(bytes) => serde_json::Value::String(to_hex(bytes)),
        Value::U64(n) => serde_json::Value::Number(Number::from(*n)),
        Value::I64(n) => serde_json::Value::Number(Number::from(*n)),
        Value::F64(n) => match Number::from_f64(*n) {
            Some(num) => serde_json::Value::Number(num),
            None => serde_json::Value::String(n.to_string()),
        },
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Str(s) => serde_json::Value::String(s.clone()),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}
