//! Decode context: the stack of in-progress struct scopes used to resolve
//! dynamic array counts against fields decoded earlier in the same stream.
//!
//! Each struct decode pushes a scope and inserts every field into it as soon
//! as that field finishes decoding, so a later sibling can reference it. The
//! scope is popped (and becomes the struct's value) when the struct returns.
//! Nothing in here outlives a single decode call.

use indexmap::IndexMap;

use crate::errors::PathError;
use crate::value::Value;

type Scope = IndexMap<String, Value>;

/// Scope stack for one decode invocation.
#[derive(Debug, Default)]
pub struct Context {
    scopes: Vec<Scope>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pops the innermost scope, yielding the completed struct's fields.
    ///
    /// Panics if no scope is open; the codec tree always pairs push and pop.
    pub fn pop_scope(&mut self) -> Scope {
        self.scopes.pop().expect("pop_scope without open scope")
    }

    /// Records a decoded field in the innermost scope, making it visible to
    /// later siblings.
    pub fn insert(&mut self, name: String, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    /// Resolves a dot-separated reference like `header.num_nodes` to an
    /// element count.
    ///
    /// The first segment is looked up innermost-scope-first; the remaining
    /// segments index into nested struct values. Fields not yet decoded are
    /// simply absent, so forward references fail with [PathError::Missing].
    pub fn resolve(&self, reference: &str) -> Result<usize, PathError> {
        resolve_in(self.scopes.iter().rev(), reference)
    }
}

/// Shared path-walking over any stack of scopes, innermost first. Used by the
/// decode context above and by the encoder to verify path-referenced counts
/// against the caller-supplied value.
pub(crate) fn resolve_in<'a, I>(scopes: I, reference: &str) -> Result<usize, PathError>
where
    I: Iterator<Item = &'a Scope>,
{
    let mut segments = reference.split('.');
    let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(|| {
        PathError::Missing {
            reference: reference.to_string(),
            segment: String::new(),
        }
    })?;

    let mut current: Option<&Value> = None;
    for scope in scopes {
        if let Some(value) = scope.get(first) {
            current = Some(value);
            break;
        }
    }

    let mut current = current.ok_or_else(|| PathError::Missing {
        reference: reference.to_string(),
        segment: first.to_string(),
    })?;

    for segment in segments {
        match current {
            Value::Struct(map) => {
                current = map.get(segment).ok_or_else(|| PathError::Missing {
                    reference: reference.to_string(),
                    segment: segment.to_string(),
                })?;
            }
            _ => {
                return Err(PathError::NotAStruct {
                    reference: reference.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
    }

    current.as_count().ok_or_else(|| PathError::NotAnInteger {
        reference: reference.to_string(),
    })
}
