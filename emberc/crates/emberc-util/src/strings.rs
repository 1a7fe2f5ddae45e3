//! Interned string table.
//!
//! String constants are stored once and referred to by a stable [`StrId`]
//! handle; equality on handles is equality on values. The emitter owns
//! the table while compiling and surrenders it to the VM by move, where
//! it keeps growing as `ADD` concatenates strings at runtime. The whole
//! pipeline is single-threaded, so no synchronisation is involved.

use rustc_hash::FxHashMap;
use std::fmt;

/// Stable handle to an interned string.
///
/// Handles index into the table's storage vector and stay valid for the
/// lifetime of the table; entries are never removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrId(pub u32);

impl StrId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "str#{}", self.0)
    }
}

/// Deduplicating set of owned strings with stable handles.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    lookup: FxHashMap<String, StrId>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `value`, returning the handle of the existing entry when
    /// the value is already present.
    pub fn intern(&mut self, value: &str) -> StrId {
        if let Some(&id) = self.lookup.get(value) {
            return id;
        }
        let id = StrId(self.strings.len() as u32);
        self.strings.push(value.to_string());
        self.lookup.insert(value.to_string(), id);
        id
    }

    /// Resolve a handle back to its string.
    ///
    /// # Panics
    ///
    /// Panics on a handle that was not produced by this table.
    pub fn resolve(&self, id: StrId) -> &str {
        &self.strings[id.index()]
    }

    /// Non-panicking variant of [`StringTable::resolve`], used when
    /// decoding bytecode that may be malformed.
    pub fn get(&self, id: StrId) -> Option<&str> {
        self.strings.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut table = StringTable::new();
        let a = table.intern("hello");
        let b = table.intern("world");
        let c = table.intern("hello");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolve_roundtrips() {
        let mut table = StringTable::new();
        let id = table.intern("x=");
        assert_eq!(table.resolve(id), "x=");
        assert_eq!(table.get(id), Some("x="));
        assert_eq!(table.get(StrId(99)), None);
    }

    #[test]
    fn handles_stay_valid_while_growing() {
        let mut table = StringTable::new();
        let first = table.intern("first");
        for i in 0..256 {
            table.intern(&format!("filler_{}", i));
        }
        assert_eq!(table.resolve(first), "first");
    }

    #[test]
    fn empty_string_is_a_value() {
        let mut table = StringTable::new();
        let id = table.intern("");
        assert_eq!(table.resolve(id), "");
        assert_eq!(table.intern(""), id);
    }
}
