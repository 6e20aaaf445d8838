//! String interner for identifier deduplication.
//!
//! Identifiers, member names and parameter labels are interned into a pool
//! and passed around as u32 indices (Atoms). This eliminates duplicate
//! string allocations for common names and turns name comparison into an
//! integer comparison.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::RwLock;

/// An interned string identifier.
///
/// Atoms are cheap to copy (just a u32) and can be compared with == in O(1).
/// To get the actual string, use `Interner::resolve(atom)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// A sentinel value representing no atom / empty string.
    pub const NONE: Atom = Atom(0);

    /// Check if this is the empty/none atom.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Names that show up in almost every Aster module: intrinsic type names,
/// the literal protocols, and common member names. Seeding them keeps the
/// hot path of the declaration table allocation-free.
static COMMON_STRINGS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Intrinsic type names
        "Bool", "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32",
        "UInt64", "Float32", "Float64", "String", "Character", "Never",
        // Literal protocols and their requirements
        "IntegerLiteral", "FloatLiteral", "StringLiteral", "BooleanLiteral", "NilLiteral",
        "init", "value",
        // Common protocol names
        "Equatable", "Hashable", "Comparable", "Sequence", "Collection",
        // Common member names
        "count", "first", "last", "element", "Element", "Key", "Value", "Index", "self",
    ]
});

/// Interner for identifier strings.
///
/// Interning goes through a `RwLock` so the interner can be shared by
/// reference between the constraint system and the rewriter; resolution
/// returns owned strings to keep the lock scope minimal.
pub struct Interner {
    inner: RwLock<InternerInner>,
}

struct InternerInner {
    map: FxHashMap<Box<str>, Atom>,
    strings: Vec<Box<str>>,
}

impl Interner {
    pub fn new() -> Interner {
        let mut inner = InternerInner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(COMMON_STRINGS.len() + 1),
        };
        // Atom(0) is reserved for the empty string so Atom::NONE resolves.
        inner.strings.push("".into());
        inner.map.insert("".into(), Atom::NONE);
        for s in COMMON_STRINGS.iter() {
            let atom = Atom(inner.strings.len() as u32);
            inner.strings.push((*s).into());
            inner.map.insert((*s).into(), atom);
        }
        Interner {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a string, returning its atom. Idempotent.
    pub fn intern(&self, s: &str) -> Atom {
        {
            let inner = self.inner.read().unwrap();
            if let Some(&atom) = inner.map.get(s) {
                return atom;
            }
        }
        let mut inner = self.inner.write().unwrap();
        // Re-check under the write lock.
        if let Some(&atom) = inner.map.get(s) {
            return atom;
        }
        let atom = Atom(inner.strings.len() as u32);
        inner.strings.push(s.into());
        inner.map.insert(s.into(), atom);
        atom
    }

    /// Resolve an atom back to its string.
    pub fn resolve(&self, atom: Atom) -> String {
        let inner = self.inner.read().unwrap();
        inner
            .strings
            .get(atom.0 as usize)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Number of interned strings (including the pre-seeded set).
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Interner {
    fn default() -> Self {
        Interner::new()
    }
}
