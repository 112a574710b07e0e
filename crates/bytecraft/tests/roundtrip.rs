//! Round-trip properties: decoding then re-encoding a well-formed stream
//! reproduces it byte for byte, for every layout without lossy adapters.

use bytecraft::compiled::Codec;
use bytecraft::registry::Registry;
use bytecraft::serde::SchemaDef;
use bytecraft::value::Value;
use indexmap::IndexMap;
use proptest::prelude::*;

fn compile(json: &str) -> Codec {
    let def: SchemaDef = serde_json::from_str(json).unwrap();
    Codec::compile(&def, &Registry::default()).unwrap()
}

fn fixed_schema() -> Codec {
    // 12 bytes total: every node kind that loses no information.
    compile(
        r#"{"type": "struct", "fields": [
            {"name": "id", "type": "uint16"},
            {"name": "offset", "type": "int32"},
            {"name": "raw", "type": "bytes", "size": 3},
            {"name": "pair", "type": "array", "count": 2,
             "elements": {"type": "uint8"}},
            {"name": "flags", "type": "bitfield", "size": 8, "flags": [
                {"name": "active", "bit": 0},
                {"name": "kind", "bit": 1},
                {"name": "level", "bit": 4}
            ]}
        ]}"#,
    )
}

proptest! {
    #[test]
    fn encode_decode_is_identity_on_bytes(data in proptest::collection::vec(any::<u8>(), 12)) {
        let codec = fixed_schema();
        let (value, consumed) = codec.decode(&data).unwrap();
        prop_assert_eq!(consumed, 12);
        prop_assert_eq!(codec.encode(&value).unwrap(), data);
    }

    #[test]
    fn dynamic_count_round_trips(items in proptest::collection::vec(any::<u8>(), 0..40)) {
        let codec = compile(
            r#"{"type": "struct", "fields": [
                {"name": "num", "type": "uint8"},
                {"name": "items", "type": "array", "count": "num",
                 "elements": {"type": "uint8"}}
            ]}"#,
        );

        let mut data = vec![items.len() as u8];
        data.extend_from_slice(&items);

        let (value, consumed) = codec.decode(&data).unwrap();
        prop_assert_eq!(consumed, data.len());
        prop_assert_eq!(codec.encode(&value).unwrap(), data);
    }

    #[test]
    fn greedy_array_round_trips(words in proptest::collection::vec(any::<u16>(), 0..32)) {
        let codec = compile(
            r#"{"type": "array", "until_eof": true, "elements": {"type": "uint16"}}"#,
        );

        let mut data = Vec::with_capacity(words.len() * 2);
        for w in &words {
            data.extend_from_slice(&w.to_le_bytes());
        }

        let (value, consumed) = codec.decode(&data).unwrap();
        prop_assert_eq!(consumed, data.len());
        prop_assert_eq!(codec.encode(&value).unwrap(), data);
    }

    #[test]
    fn bitfield_value_round_trips(active: bool, kind in 0u64..8, level in 0u64..16) {
        let codec = compile(
            r#"{"type": "bitfield", "size": 8, "flags": [
                {"name": "active", "bit": 0},
                {"name": "kind", "bit": 1},
                {"name": "level", "bit": 4}
            ]}"#,
        );

        let mut map = IndexMap::new();
        map.insert("active".to_string(), Value::Bool(active));
        map.insert("kind".to_string(), Value::U64(kind));
        map.insert("level".to_string(), Value::U64(level));
        let value = Value::Struct(map);

        let bytes = codec.encode(&value).unwrap();
        let (decoded, _) = codec.decode(&bytes).unwrap();
        prop_assert_eq!(decoded, value);
    }
}
