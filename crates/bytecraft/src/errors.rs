//! Error types for schema compilation and for decoding/encoding byte streams.

use std::fmt;

use thiserror::Error;

/// Errors produced when compiling a [crate::serde::SchemaDef] into a
/// [crate::compiled::Codec]. Fatal for the offending schema only; a batch
/// loader may skip it and continue with the rest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Schema `type` string is not a structural keyword and not in the registry.
    #[error("unknown type in schema: `{0}`")]
    UnknownType(String),
    /// A required attribute is absent for the given node kind.
    #[error("`{kind}` schema is missing required attribute `{attr}`")]
    MissingAttribute { kind: &'static str, attr: &'static str },
    /// Two fields in the same struct share a name.
    #[error("duplicate field name `{0}` in struct")]
    DuplicateField(String),
    /// Array declares neither `count` nor `until_eof`.
    #[error("array must have `count` or `until_eof`")]
    MissingArrayCount,
    /// Array declares both `count` and `until_eof`.
    #[error("array must have exactly one of `count` and `until_eof`")]
    ConflictingArrayCount,
    /// `bytes` size is zero or negative.
    #[error("bytes must have a positive `size`, got {0}")]
    InvalidByteSize(i64),
    /// `string` length is zero or negative.
    #[error("string must have a positive `length`, got {0}")]
    InvalidStringLength(i64),
    /// String encoding name is not supported.
    #[error("unsupported string encoding `{0}`")]
    UnknownEncoding(String),
    /// Bitfield width is outside 1..=64 bits.
    #[error("bitfield width must be between 1 and 64 bits, got {0}")]
    InvalidBitfieldWidth(i64),
    /// A flag bit position lies at or beyond the bitfield width.
    #[error("flag `{name}` at bit {bit} does not fit a {width_bits}-bit bitfield")]
    FlagOutOfRange {
        name: String,
        bit: u32,
        width_bits: u32,
    },
    /// Two flags claim the same start bit, which would give one of them zero width.
    #[error("duplicate flag bit {0} in bitfield")]
    DuplicateFlagBit(u32),
    /// Scale is zero, NaN, or infinite.
    #[error("scale must be a finite, non-zero number")]
    InvalidScale,
    /// Filename pattern does not parse as a glob.
    #[error("invalid file pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Dotted-path lookup failures shared by decode-time count resolution and
/// encode-time count verification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    /// No open scope contains the first path segment, or a later segment is
    /// absent. A field that has not been decoded yet is indistinguishable
    /// from one that does not exist.
    #[error("path `{reference}` not found (segment `{segment}`)")]
    Missing { reference: String, segment: String },
    /// An intermediate segment resolved to something that is not a struct.
    #[error("path `{reference}` indexes into a non-struct value at `{segment}`")]
    NotAStruct { reference: String, segment: String },
    /// The final value is not a non-negative integer.
    #[error("path `{reference}` resolved to a non-integer value")]
    NotAnInteger { reference: String },
}

/// A decode failure, carrying the dotted path of the field that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// Path from the root of the codec tree to the failing field, e.g.
    /// `header.nodes[3].flags`. Empty when the root codec itself failed.
    pub path: String,
    pub kind: DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeErrorKind {
    /// Stream ended inside a fixed-size read.
    #[error("unexpected end of input: need {needed} more bytes, have {available}")]
    UnexpectedEof { needed: usize, available: usize },
    /// A dynamic array count could not be resolved.
    #[error("cannot resolve array count: {0}")]
    Count(#[from] PathError),
    /// A greedy array's element decoded successfully without consuming any
    /// bytes, so the array could never reach end of input.
    #[error("greedy array element consumed no bytes")]
    ZeroSizeElement,
    /// A byte is outside the 7-bit ASCII range.
    #[error("invalid ascii byte {byte:#04x} in string")]
    InvalidAscii { byte: u8 },
    /// String bytes are not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind) -> Self {
        DecodeError {
            path: String::new(),
            kind,
        }
    }

    /// Prefixes a path segment as the error unwinds out of a struct field.
    pub(crate) fn at(mut self, segment: &str) -> Self {
        self.path = join_path(segment, &self.path);
        self
    }

    /// Prefixes an array index as the error unwinds out of an element.
    pub(crate) fn at_index(mut self, index: usize) -> Self {
        self.path = join_path(&format!("[{index}]"), &self.path);
        self
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        DecodeError::new(kind)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "decode failed: {}", self.kind)
        } else {
            write!(f, "decode failed at `{}`: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// An encode failure, carrying the dotted path of the field that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeError {
    pub path: String,
    pub kind: EncodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeErrorKind {
    /// A struct field required by the codec is absent from the supplied value.
    #[error("missing field `{0}`")]
    MissingField(String),
    /// The supplied value has the wrong shape for this codec node.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// An integer does not fit the primitive's range.
    #[error("value {value} does not fit in {ty}")]
    OutOfRange { value: i128, ty: &'static str },
    /// A fixed-size byte blob has the wrong length.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// Encoded text does not fit the declared string length.
    #[error("string of {len} bytes exceeds declared length {max}")]
    StringTooLong { len: usize, max: usize },
    /// Text contains a byte outside the 7-bit ASCII range.
    #[error("string contains non-ascii byte {byte:#04x}")]
    NonAsciiText { byte: u8 },
    /// A non-finite or out-of-range number reached a scaled integer codec.
    #[error("number {value} cannot be stored as a scaled integer")]
    InvalidScaledNumber { value: f64 },
    /// A literal- or path-counted array was supplied the wrong number of elements.
    #[error("array has {actual} elements, count requires {expected}")]
    CountMismatch { expected: usize, actual: usize },
    /// A dynamic array count could not be verified against the supplied value.
    #[error("cannot resolve array count: {0}")]
    Count(#[from] PathError),
}

impl EncodeError {
    pub(crate) fn new(kind: EncodeErrorKind) -> Self {
        EncodeError {
            path: String::new(),
            kind,
        }
    }

    pub(crate) fn at(mut self, segment: &str) -> Self {
        self.path = join_path(segment, &self.path);
        self
    }

    pub(crate) fn at_index(mut self, index: usize) -> Self {
        self.path = join_path(&format!("[{index}]"), &self.path);
        self
    }
}

impl From<EncodeErrorKind> for EncodeError {
    fn from(kind: EncodeErrorKind) -> Self {
        EncodeError::new(kind)
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "encode failed: {}", self.kind)
        } else {
            write!(f, "encode failed at `{}`: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

fn join_path(segment: &str, rest: &str) -> String {
    if rest.is_empty() {
        segment.to_string()
    } else if rest.starts_with('[') {
        format!("{segment}{rest}")
    } else {
        format!("{segment}.{rest}")
    }
}
