//! Registry of fixed-width primitive types, resolved by name at compile time.
//!
//! All primitives are little-endian, matching the file formats this library
//! was written for. Lookup is case-insensitive and accepts both the short
//! spellings (`u32`, `int16`) and the explicit construct-style spellings
//! (`Int32ul`, `Int16sl`, `Float32l`).

use std::collections::HashMap;

/// A fixed-width numeric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PrimKind {
    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            PrimKind::U8 | PrimKind::I8 => 1,
            PrimKind::U16 | PrimKind::I16 => 2,
            PrimKind::U32 | PrimKind::I32 | PrimKind::F32 => 4,
            PrimKind::U64 | PrimKind::I64 | PrimKind::F64 => 8,
        }
    }

    /// Canonical lowercase name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            PrimKind::U8 => "u8",
            PrimKind::U16 => "u16",
            PrimKind::U32 => "u32",
            PrimKind::U64 => "u64",
            PrimKind::I8 => "i8",
            PrimKind::I16 => "i16",
            PrimKind::I32 => "i32",
            PrimKind::I64 => "i64",
            PrimKind::F32 => "f32",
            PrimKind::F64 => "f64",
        }
    }
}

/// Maps schema type-name strings to primitives. Built once at startup and
/// shared by every compile; extend with [Registry::register] rather than
/// mutating any global table.
#[derive(Debug, Clone)]
pub struct Registry {
    types: HashMap<String, PrimKind>,
}

impl Registry {
    /// An empty registry with no names registered.
    pub fn empty() -> Self {
        Registry {
            types: HashMap::new(),
        }
    }

    /// Registers `name` for `kind`. Names are matched case-insensitively;
    /// re-registering a name replaces the previous entry.
    pub fn register(&mut self, name: &str, kind: PrimKind) {
        self.types.insert(name.to_ascii_lowercase(), kind);
    }

    /// Looks up a type name, ignoring ASCII case. Returns `None` for names
    /// that are not primitives (structural keywords like `struct` or `array`
    /// are not registered here).
    pub fn resolve(&self, name: &str) -> Option<PrimKind> {
        self.types.get(&name.to_ascii_lowercase()).copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry::empty();

        let table: &[(&str, PrimKind)] = &[
            // Canonical short names
            ("u8", PrimKind::U8),
            ("u16", PrimKind::U16),
            ("u32", PrimKind::U32),
            ("u64", PrimKind::U64),
            ("i8", PrimKind::I8),
            ("i16", PrimKind::I16),
            ("i32", PrimKind::I32),
            ("i64", PrimKind::I64),
            ("f32", PrimKind::F32),
            ("f64", PrimKind::F64),
            // Construct-style explicit names (unsigned/signed little-endian)
            ("Int8ul", PrimKind::U8),
            ("Int16ul", PrimKind::U16),
            ("Int32ul", PrimKind::U32),
            ("Int64ul", PrimKind::U64),
            ("Int8sl", PrimKind::I8),
            ("Int16sl", PrimKind::I16),
            ("Int32sl", PrimKind::I32),
            ("Int64sl", PrimKind::I64),
            ("Float32l", PrimKind::F32),
            ("Float64l", PrimKind::F64),
            // C-style aliases used by existing schemas
            ("int8", PrimKind::I8),
            ("uint8", PrimKind::U8),
            ("int16", PrimKind::I16),
            ("uint16", PrimKind::U16),
            ("int32", PrimKind::I32),
            ("uint32", PrimKind::U32),
            ("int64", PrimKind::I64),
            ("uint64", PrimKind::U64),
            ("float32", PrimKind::F32),
            ("float64", PrimKind::F64),
        ];

        for (name, kind) in table {
            registry.register(name, *kind);
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_canonical_names() {
        let registry = Registry::default();
        assert_eq!(registry.resolve("u32"), Some(PrimKind::U32));
        assert_eq!(registry.resolve("f64"), Some(PrimKind::F64));
    }

    #[test]
    fn test_resolve_aliases_case_insensitive() {
        let registry = Registry::default();
        assert_eq!(registry.resolve("Int32sl"), Some(PrimKind::I32));
        assert_eq!(registry.resolve("int32sl"), Some(PrimKind::I32));
        assert_eq!(registry.resolve("INT32"), Some(PrimKind::I32));
        assert_eq!(registry.resolve("uint16"), Some(PrimKind::U16));
        assert_eq!(registry.resolve("Float32l"), Some(PrimKind::F32));
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = Registry::default();
        assert_eq!(registry.resolve("struct"), None);
        assert_eq!(registry.resolve("foo"), None);
    }

    #[test]
    fn test_register_custom_name() {
        let mut registry = Registry::default();
        registry.register("dword", PrimKind::U32);
        assert_eq!(registry.resolve("DWORD"), Some(PrimKind::U32));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(PrimKind::U8.size(), 1);
        assert_eq!(PrimKind::I16.size(), 2);
        assert_eq!(PrimKind::F32.size(), 4);
        assert_eq!(PrimKind::U64.size(), 8);
    }
}
