//! # bytecraft
//!
//! A schema-driven interpreter for binary file layouts.
//!
//! Describe a fixed or variable binary layout as a declarative schema
//! (structs, arrays, packed bitfields, fixed strings, scaled numbers),
//! compile it once into a codec tree, then decode arbitrary byte streams
//! into structured values and encode them back. New formats are added by
//! authoring a schema, not by writing a parser.
//!
//! Array lengths may reference fields decoded earlier in the same stream
//! (`"count": "header.num_nodes"`), or run greedily to end of input.
//!
//! ## Example
//!
//! ```
//! use bytecraft::compiled::Codec;
//! use bytecraft::registry::Registry;
//! use bytecraft::serde::SchemaDef;
//! use bytecraft::value::Value;
//!
//! let def: SchemaDef = serde_json::from_str(r#"{
//!     "type": "struct",
//!     "fields": [
//!         {"name": "num", "type": "uint32"},
//!         {"name": "items", "type": "array", "count": "num",
//!          "elements": {"type": "uint8"}}
//!     ]
//! }"#).unwrap();
//!
//! let codec = Codec::compile(&def, &Registry::default()).unwrap();
//! let (value, consumed) = codec.decode(&[0x02, 0x00, 0x00, 0x00, 0xaa, 0xbb]).unwrap();
//!
//! assert_eq!(consumed, 6);
//! assert_eq!(value.get("num"), Some(&Value::U64(2)));
//! assert_eq!(codec.encode(&value).unwrap(), vec![0x02, 0x00, 0x00, 0x00, 0xaa, 0xbb]);
//! ```

pub mod compiled;
pub mod context;
pub mod cursor;
pub mod errors;
pub mod format;
pub mod normalize;
pub mod registry;
pub mod serde;
pub mod value;
