//! Compiled codec tree: the executable mirror of a schema description.
//!
//! [Codec::compile] turns an attribute-bag [SchemaDef] into a tree of typed
//! codec nodes, performing every required-attribute and range check up front.
//! The resulting tree is immutable and can decode any number of byte streams,
//! concurrently if desired; each decode owns its own [Context].

use indexmap::IndexMap;

use crate::context::{Context, resolve_in};
use crate::cursor::{Reader, read_uint_le, write_uint_le};
use crate::errors::{
    CompileError, DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind,
};
use crate::registry::{PrimKind, Registry};
use crate::serde::{CountDef, SchemaDef};
use crate::value::Value;

/// A compiled layout node. Every variant knows how to decode itself from a
/// byte stream and encode a [Value] back into bytes.
#[derive(Debug, Clone)]
pub enum Codec {
    /// Named fields decoded strictly in declaration order.
    Struct(StructCodec),
    /// Repeated element with a literal, referenced, or greedy count.
    Array(ArrayCodec),
    /// Fixed-width little-endian number.
    Primitive(PrimKind),
    /// Number stored as an integer, displayed divided by a fixed scale.
    Scaled(ScaledCodec),
    /// Single-bit boolean stored in one byte (bit 0). This is what the
    /// schema vocabulary calls `char`; the name is historical, the stored
    /// value is a C++ bool, not a character.
    BoolBit,
    /// Fixed-size opaque blob.
    Bytes(usize),
    /// Fixed-length padded text.
    FixedString(StringCodec),
    /// Packed integer subdivided into named bit ranges.
    Bitfield(BitfieldCodec),
}

#[derive(Debug, Clone)]
pub struct StructCodec {
    pub fields: Vec<(String, Codec)>,
}

#[derive(Debug, Clone)]
pub struct ArrayCodec {
    pub element: Box<Codec>,
    pub count: ArrayCount,
}

/// How many elements an array holds.
#[derive(Debug, Clone)]
pub enum ArrayCount {
    /// Fixed count known at compile time.
    Literal(usize),
    /// Dot-path to an integer field decoded earlier in the same stream.
    Path(String),
    /// Repeat until the stream is exhausted.
    UntilEof,
}

#[derive(Debug, Clone)]
pub struct ScaledCodec {
    pub kind: PrimKind,
    pub scale: f64,
}

/// Text encoding for [Codec::FixedString]. Both pad with NUL bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Utf8,
}

#[derive(Debug, Clone)]
pub struct StringCodec {
    pub length: usize,
    pub encoding: Encoding,
}

#[derive(Debug, Clone)]
pub struct BitfieldCodec {
    pub width_bits: u32,
    size_bytes: usize,
    /// Flags in ascending bit order, widths inferred at compile time.
    pub flags: Vec<BitFlag>,
}

#[derive(Debug, Clone)]
pub struct BitFlag {
    pub name: String,
    pub shift: u32,
    pub width: u32,
}

impl Codec {
    /// Compiles a schema description into an executable codec tree.
    ///
    /// Pure and deterministic; all validation happens here, none is deferred
    /// to decode time. An absent `type` means `struct`, matching the schema
    /// files this vocabulary grew out of.
    pub fn compile(def: &SchemaDef, registry: &Registry) -> Result<Codec, CompileError> {
        let type_name = def.type_name.as_deref().unwrap_or("struct");

        match type_name {
            "struct" => compile_struct(def, registry),
            "array" => compile_array(def, registry),
            "char" => Ok(Codec::BoolBit),
            "bytes" => compile_bytes(def),
            "string" => compile_string(def),
            "bitfield" => compile_bitfield(def),
            other => match registry.resolve(other) {
                Some(kind) => compile_primitive(def, kind),
                None => Err(CompileError::UnknownType(other.to_string())),
            },
        }
    }

    /// Decodes `data`, returning the value and the number of bytes consumed.
    ///
    /// Decoding is depth-first and left-to-right with no backtracking; a
    /// subtree consumes exactly the bytes it needs, except greedy arrays,
    /// which consume everything remaining.
    pub fn decode(&self, data: &[u8]) -> Result<(Value, usize), DecodeError> {
        let mut reader = Reader::new(data);
        let mut ctx = Context::new();
        let value = self.decode_node(&mut reader, &mut ctx)?;
        Ok((value, reader.position()))
    }

    /// Encodes `value` back into bytes, the structural inverse of
    /// [Codec::decode]. Required fields absent from `value` are errors,
    /// never zero-filled.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        let mut scopes = Vec::new();
        self.encode_node(value, &mut scopes, &mut out)?;
        Ok(out)
    }

    fn decode_node(&self, r: &mut Reader<'_>, ctx: &mut Context) -> Result<Value, DecodeError> {
        match self {
            Codec::Struct(s) => {
                ctx.push_scope();
                for (name, codec) in &s.fields {
                    match codec.decode_node(r, ctx) {
                        Ok(value) => ctx.insert(name.clone(), value),
                        Err(err) => {
                            ctx.pop_scope();
                            return Err(err.at(name));
                        }
                    }
                }
                Ok(Value::Struct(ctx.pop_scope()))
            }
            Codec::Array(a) => {
                let mut values = Vec::new();
                match &a.count {
                    ArrayCount::Literal(n) => {
                        for i in 0..*n {
                            let v = a.element.decode_node(r, ctx).map_err(|e| e.at_index(i))?;
                            values.push(v);
                        }
                    }
                    ArrayCount::Path(path) => {
                        let n = ctx
                            .resolve(path)
                            .map_err(|e| DecodeError::new(DecodeErrorKind::Count(e)))?;
                        for i in 0..n {
                            let v = a.element.decode_node(r, ctx).map_err(|e| e.at_index(i))?;
                            values.push(v);
                        }
                    }
                    ArrayCount::UntilEof => {
                        while !r.is_empty() {
                            let i = values.len();
                            let start = r.position();
                            let v = a.element.decode_node(r, ctx).map_err(|e| e.at_index(i))?;
                            // An element that consumes nothing (e.g. an empty
                            // struct) would keep the loop from ever reaching
                            // end of input.
                            if r.position() == start {
                                return Err(DecodeError::new(DecodeErrorKind::ZeroSizeElement)
                                    .at_index(i));
                            }
                            values.push(v);
                        }
                    }
                }
                Ok(Value::Array(values))
            }
            Codec::Primitive(kind) => Ok(decode_prim(*kind, r)?),
            Codec::Scaled(s) => {
                let raw = decode_prim(s.kind, r)?;
                // The raw value is always numeric by construction.
                let n = value_as_f64(&raw).unwrap_or(0.0);
                Ok(Value::F64(n / s.scale))
            }
            Codec::BoolBit => {
                let byte = r.take(1)?[0];
                Ok(Value::Bool(byte & 1 == 1))
            }
            Codec::Bytes(size) => Ok(Value::Bytes(r.take(*size)?.to_vec())),
            Codec::FixedString(s) => {
                let mut bytes = r.take(s.length)?;
                while let [rest @ .., 0] = bytes {
                    bytes = rest;
                }
                decode_text(bytes, s.encoding).map_err(DecodeError::new)
            }
            Codec::Bitfield(b) => {
                let raw = read_uint_le(r.take(b.size_bytes)?);
                let mut map = IndexMap::with_capacity(b.flags.len());
                for flag in &b.flags {
                    let value = if flag.width == 1 {
                        Value::Bool((raw >> flag.shift) & 1 == 1)
                    } else {
                        let mask = mask_for(flag.width);
                        Value::U64((raw >> flag.shift) & mask)
                    };
                    map.insert(flag.name.clone(), value);
                }
                Ok(Value::Struct(map))
            }
        }
    }

    fn encode_node<'v>(
        &self,
        value: &'v Value,
        scopes: &mut Vec<&'v IndexMap<String, Value>>,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        match self {
            Codec::Struct(s) => {
                let Value::Struct(map) = value else {
                    return Err(mismatch("struct", value));
                };
                scopes.push(map);
                for (name, codec) in &s.fields {
                    let Some(field_value) = map.get(name) else {
                        scopes.pop();
                        return Err(
                            EncodeError::new(EncodeErrorKind::MissingField(name.clone())).at(name)
                        );
                    };
                    if let Err(err) = codec.encode_node(field_value, scopes, out) {
                        scopes.pop();
                        return Err(err.at(name));
                    }
                }
                scopes.pop();
                Ok(())
            }
            Codec::Array(a) => {
                let Value::Array(items) = value else {
                    return Err(mismatch("array", value));
                };
                match &a.count {
                    ArrayCount::Literal(n) => {
                        if items.len() != *n {
                            return Err(EncodeError::new(EncodeErrorKind::CountMismatch {
                                expected: *n,
                                actual: items.len(),
                            }));
                        }
                    }
                    ArrayCount::Path(path) => {
                        let n = resolve_in(scopes.iter().rev().copied(), path)
                            .map_err(|e| EncodeError::new(EncodeErrorKind::Count(e)))?;
                        if items.len() != n {
                            return Err(EncodeError::new(EncodeErrorKind::CountMismatch {
                                expected: n,
                                actual: items.len(),
                            }));
                        }
                    }
                    // Greedy arrays have no terminator; write all elements.
                    ArrayCount::UntilEof => {}
                }
                for (i, item) in items.iter().enumerate() {
                    a.element
                        .encode_node(item, scopes, out)
                        .map_err(|e| e.at_index(i))?;
                }
                Ok(())
            }
            Codec::Primitive(kind) => encode_prim(*kind, value, out).map_err(EncodeError::new),
            Codec::Scaled(s) => {
                let Some(n) = value_as_f64(value) else {
                    return Err(mismatch("number", value));
                };
                // Truncates toward zero, not rounds: 2.7 * 100 encodes as 270,
                // -2.7 * 100 as -270. Matches the legacy schema semantics;
                // schema authors relying on rounding should scale explicitly.
                let scaled = (n * s.scale).trunc();
                // NaN, infinities, and values past i64 all fail here rather
                // than saturate into a wrong raw integer.
                if !((i64::MIN as f64..i64::MAX as f64).contains(&scaled)) {
                    return Err(EncodeError::new(EncodeErrorKind::InvalidScaledNumber {
                        value: n,
                    }));
                }
                encode_prim(s.kind, &Value::I64(scaled as i64), out).map_err(EncodeError::new)
            }
            Codec::BoolBit => {
                let Value::Bool(b) = value else {
                    return Err(mismatch("bool", value));
                };
                out.push(*b as u8);
                Ok(())
            }
            Codec::Bytes(size) => {
                let Value::Bytes(bytes) = value else {
                    return Err(mismatch("bytes", value));
                };
                if bytes.len() != *size {
                    return Err(EncodeError::new(EncodeErrorKind::LengthMismatch {
                        expected: *size,
                        actual: bytes.len(),
                    }));
                }
                out.extend_from_slice(bytes);
                Ok(())
            }
            Codec::FixedString(s) => {
                let Value::Str(text) = value else {
                    return Err(mismatch("string", value));
                };
                let bytes = text.as_bytes();
                if bytes.len() > s.length {
                    return Err(EncodeError::new(EncodeErrorKind::StringTooLong {
                        len: bytes.len(),
                        max: s.length,
                    }));
                }
                if s.encoding == Encoding::Ascii {
                    if let Some(&byte) = bytes.iter().find(|b| !b.is_ascii()) {
                        return Err(EncodeError::new(EncodeErrorKind::NonAsciiText { byte }));
                    }
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + (s.length - bytes.len()), 0);
                Ok(())
            }
            Codec::Bitfield(b) => {
                let Value::Struct(map) = value else {
                    return Err(mismatch("struct", value));
                };
                let mut raw = 0u64;
                for flag in &b.flags {
                    // Absent flags stay zero; only present keys contribute bits.
                    let Some(v) = map.get(&flag.name) else {
                        continue;
                    };
                    let bits = match v {
                        Value::Bool(b) => *b as u64,
                        Value::U64(n) => *n,
                        Value::I64(n) if *n >= 0 => *n as u64,
                        _ => return Err(mismatch("bool or unsigned integer", v).at(&flag.name)),
                    };
                    raw |= (bits & mask_for(flag.width)) << flag.shift;
                }
                write_uint_le(raw, b.size_bytes, out);
                Ok(())
            }
        }
    }
}

fn compile_struct(def: &SchemaDef, registry: &Registry) -> Result<Codec, CompileError> {
    let mut fields: Vec<(String, Codec)> = Vec::new();

    for field in def.fields.as_deref().unwrap_or_default() {
        let name = field.name.clone().ok_or(CompileError::MissingAttribute {
            kind: "field",
            attr: "name",
        })?;
        if fields.iter().any(|(existing, _)| *existing == name) {
            return Err(CompileError::DuplicateField(name));
        }
        fields.push((name, Codec::compile(field, registry)?));
    }

    Ok(Codec::Struct(StructCodec { fields }))
}

fn compile_array(def: &SchemaDef, registry: &Registry) -> Result<Codec, CompileError> {
    let element = def.elements.as_deref().ok_or(CompileError::MissingAttribute {
        kind: "array",
        attr: "elements",
    })?;
    let element = Box::new(Codec::compile(element, registry)?);

    let until_eof = def.until_eof.unwrap_or(false);
    let count = match (&def.count, until_eof) {
        (Some(_), true) => return Err(CompileError::ConflictingArrayCount),
        (None, false) => return Err(CompileError::MissingArrayCount),
        (None, true) => ArrayCount::UntilEof,
        (Some(CountDef::Literal(n)), false) => ArrayCount::Literal(*n as usize),
        (Some(CountDef::Path(path)), false) => ArrayCount::Path(path.clone()),
    };

    Ok(Codec::Array(ArrayCodec { element, count }))
}

fn compile_bytes(def: &SchemaDef) -> Result<Codec, CompileError> {
    let size = def.size.unwrap_or(0);
    if size <= 0 {
        return Err(CompileError::InvalidByteSize(size));
    }
    Ok(Codec::Bytes(size as usize))
}

fn compile_string(def: &SchemaDef) -> Result<Codec, CompileError> {
    let length = def.length.ok_or(CompileError::MissingAttribute {
        kind: "string",
        attr: "length",
    })?;
    if length <= 0 {
        return Err(CompileError::InvalidStringLength(length));
    }

    let encoding = match def.encoding.as_deref() {
        None | Some("ascii") => Encoding::Ascii,
        Some("utf8") | Some("utf-8") => Encoding::Utf8,
        Some(other) => return Err(CompileError::UnknownEncoding(other.to_string())),
    };

    Ok(Codec::FixedString(StringCodec {
        length: length as usize,
        encoding,
    }))
}

fn compile_bitfield(def: &SchemaDef) -> Result<Codec, CompileError> {
    let width = def.size.unwrap_or(16);
    if !(1..=64).contains(&width) {
        return Err(CompileError::InvalidBitfieldWidth(width));
    }
    let width_bits = width as u32;

    let mut defs: Vec<_> = def.flags.clone().unwrap_or_default();
    defs.sort_by_key(|f| f.bit);

    let mut flags = Vec::with_capacity(defs.len());
    for (i, flag) in defs.iter().enumerate() {
        if flag.bit >= width_bits {
            return Err(CompileError::FlagOutOfRange {
                name: flag.name.clone(),
                bit: flag.bit,
                width_bits,
            });
        }
        // Width runs to the next flag's start bit, or to the end of the field.
        let end = match defs.get(i + 1) {
            Some(next) if next.bit == flag.bit => {
                return Err(CompileError::DuplicateFlagBit(flag.bit));
            }
            Some(next) => next.bit.min(width_bits),
            None => width_bits,
        };
        flags.push(BitFlag {
            name: flag.name.clone(),
            shift: flag.bit,
            width: end - flag.bit,
        });
    }

    Ok(Codec::Bitfield(BitfieldCodec {
        width_bits,
        size_bytes: (width_bits as usize).div_ceil(8),
        flags,
    }))
}

fn compile_primitive(def: &SchemaDef, kind: PrimKind) -> Result<Codec, CompileError> {
    match def.scale {
        None => Ok(Codec::Primitive(kind)),
        Some(scale) => {
            if !scale.is_finite() || scale == 0.0 {
                return Err(CompileError::InvalidScale);
            }
            Ok(Codec::Scaled(ScaledCodec { kind, scale }))
        }
    }
}

fn decode_prim(kind: PrimKind, r: &mut Reader<'_>) -> Result<Value, DecodeErrorKind> {
    let value = match kind {
        PrimKind::U8 => Value::U64(u8::from_le_bytes(r.take_array()?) as u64),
        PrimKind::U16 => Value::U64(u16::from_le_bytes(r.take_array()?) as u64),
        PrimKind::U32 => Value::U64(u32::from_le_bytes(r.take_array()?) as u64),
        PrimKind::U64 => Value::U64(u64::from_le_bytes(r.take_array()?)),
        PrimKind::I8 => Value::I64(i8::from_le_bytes(r.take_array()?) as i64),
        PrimKind::I16 => Value::I64(i16::from_le_bytes(r.take_array()?) as i64),
        PrimKind::I32 => Value::I64(i32::from_le_bytes(r.take_array()?) as i64),
        PrimKind::I64 => Value::I64(i64::from_le_bytes(r.take_array()?)),
        PrimKind::F32 => Value::F64(f32::from_le_bytes(r.take_array()?) as f64),
        PrimKind::F64 => Value::F64(f64::from_le_bytes(r.take_array()?)),
    };
    Ok(value)
}

fn encode_prim(kind: PrimKind, value: &Value, out: &mut Vec<u8>) -> Result<(), EncodeErrorKind> {
    match kind {
        PrimKind::F32 => {
            let n = value_as_f64(value).ok_or_else(|| mismatch_kind("number", value))?;
            out.extend_from_slice(&(n as f32).to_le_bytes());
            Ok(())
        }
        PrimKind::F64 => {
            let n = value_as_f64(value).ok_or_else(|| mismatch_kind("number", value))?;
            out.extend_from_slice(&n.to_le_bytes());
            Ok(())
        }
        _ => {
            let n = value_as_i128(value).ok_or_else(|| mismatch_kind("integer", value))?;
            encode_int(kind, n, out)
        }
    }
}

fn encode_int(kind: PrimKind, n: i128, out: &mut Vec<u8>) -> Result<(), EncodeErrorKind> {
    let (min, max): (i128, i128) = match kind {
        PrimKind::U8 => (0, u8::MAX as i128),
        PrimKind::U16 => (0, u16::MAX as i128),
        PrimKind::U32 => (0, u32::MAX as i128),
        PrimKind::U64 => (0, u64::MAX as i128),
        PrimKind::I8 => (i8::MIN as i128, i8::MAX as i128),
        PrimKind::I16 => (i16::MIN as i128, i16::MAX as i128),
        PrimKind::I32 => (i32::MIN as i128, i32::MAX as i128),
        PrimKind::I64 => (i64::MIN as i128, i64::MAX as i128),
        PrimKind::F32 | PrimKind::F64 => unreachable!("handled by encode_prim"),
    };

    if n < min || n > max {
        return Err(EncodeErrorKind::OutOfRange {
            value: n,
            ty: kind.name(),
        });
    }

    // Two's-complement little-endian truncation covers both signed and
    // unsigned kinds once the range check has passed.
    out.extend_from_slice(&(n as u64).to_le_bytes()[..kind.size()]);
    Ok(())
}

fn decode_text(bytes: &[u8], encoding: Encoding) -> Result<Value, DecodeErrorKind> {
    match encoding {
        Encoding::Ascii => {
            if let Some(&byte) = bytes.iter().find(|b| !b.is_ascii()) {
                return Err(DecodeErrorKind::InvalidAscii { byte });
            }
            // Checked above: all bytes are 7-bit, so this is valid UTF-8.
            Ok(Value::Str(
                String::from_utf8_lossy(bytes).into_owned(),
            ))
        }
        Encoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Value::Str(s.to_string())),
            Err(_) => Err(DecodeErrorKind::InvalidUtf8),
        },
    }
}

fn mask_for(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::F64(n) => Some(*n),
        Value::I64(n) => Some(*n as f64),
        Value::U64(n) => Some(*n as f64),
        _ => None,
    }
}

fn value_as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::I64(n) => Some(*n as i128),
        Value::U64(n) => Some(*n as i128),
        _ => None,
    }
}

fn mismatch(expected: &'static str, actual: &Value) -> EncodeError {
    EncodeError::new(mismatch_kind(expected, actual))
}

fn mismatch_kind(expected: &'static str, actual: &Value) -> EncodeErrorKind {
    EncodeErrorKind::TypeMismatch {
        expected,
        actual: actual.type_name(),
    }
}
