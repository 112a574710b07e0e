//! JSON-deserializable schema description.
//!
//! These types mirror the attribute-bag shape of schema files on disk: every
//! node is a bag with a `type` discriminator string plus whatever attributes
//! that kind needs. Nothing is validated here beyond JSON well-formedness;
//! all required-attribute and range checks happen once, when the bag is
//! compiled into a [crate::compiled::Codec].

use serde::{Deserialize, Serialize};

/// Top-level schema file: a named format, the filename pattern it applies
/// to, and the root layout description.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FormatDef {
    /// Format identifier, e.g. `"nodes"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Exact filename or glob this format applies to.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Accepted alias for `pattern`; `pattern` wins when both are present.
    #[serde(default)]
    pub file_pattern: Option<String>,
    /// Root layout node, almost always a struct.
    pub structure: SchemaDef,
}

impl FormatDef {
    /// The effective filename pattern, defaulting to match-anything.
    pub fn pattern(&self) -> &str {
        self.pattern
            .as_deref()
            .or(self.file_pattern.as_deref())
            .unwrap_or("*")
    }
}

/// One layout node. A struct field is the nested node itself carrying a
/// `name`, so this single shape describes both.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SchemaDef {
    /// Node kind: `struct`, `array`, `bytes`, `string`, `bitfield`, `char`,
    /// or any primitive type name. Defaults to `struct` when absent.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    /// Field name when this node appears in a struct's `fields` list.
    #[serde(default)]
    pub name: Option<String>,
    /// Struct: ordered field list.
    #[serde(default)]
    pub fields: Option<Vec<SchemaDef>>,
    /// Array: element layout.
    #[serde(default)]
    pub elements: Option<Box<SchemaDef>>,
    /// Array: literal element count, or a dot-path to an already-decoded
    /// integer field (`"header.num_nodes"`).
    #[serde(default)]
    pub count: Option<CountDef>,
    /// Array: repeat until the stream is exhausted. Mutually exclusive with
    /// `count`.
    #[serde(default)]
    pub until_eof: Option<bool>,
    /// Bytes: blob size in bytes. Bitfield: width in bits (default 16).
    #[serde(default)]
    pub size: Option<i64>,
    /// String: fixed encoded length in bytes.
    #[serde(default)]
    pub length: Option<i64>,
    /// String: text encoding, `ascii` (default) or `utf8`.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Primitive: divisor mapping the stored integer to a display value.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Bitfield: named flags with their start bits.
    #[serde(default)]
    pub flags: Option<Vec<FlagDef>>,
}

/// Array count: either a literal or a path reference.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CountDef {
    Literal(u64),
    Path(String),
}

/// A named bit position inside a bitfield. The flag's width is the gap to the
/// next flag's bit (or to the end of the bitfield for the last one).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FlagDef {
    pub name: String,
    pub bit: u32,
}
