//! String interner backing [`Name`].
//!
//! The interner is append-only for the lifetime of a compilation. Lookup by
//! `Name` never fails for names minted by the same interner.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Append-only string interner.
///
/// Interning the same string twice returns the same [`Name`]. The empty
/// string is pre-interned as [`Name::EMPTY`].
#[derive(Debug, Default)]
pub struct Interner {
    inner: RwLock<InternerInner>,
}

#[derive(Debug)]
struct InternerInner {
    strings: Vec<Box<str>>,
    indices: FxHashMap<Box<str>, Name>,
}

impl Default for InternerInner {
    fn default() -> Self {
        let mut inner = InternerInner {
            strings: Vec::new(),
            indices: FxHashMap::default(),
        };
        let empty: Box<str> = "".into();
        inner.strings.push(empty.clone());
        inner.indices.insert(empty, Name::EMPTY);
        inner
    }
}

impl Interner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its [`Name`].
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&name) = self.inner.read().indices.get(s) {
            return name;
        }

        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have interned
        // between the read and the write.
        if let Some(&name) = inner.indices.get(s) {
            return name;
        }

        let name = Name::from_raw(u32::try_from(inner.strings.len()).unwrap_or(u32::MAX));
        let boxed: Box<str> = s.into();
        inner.strings.push(boxed.clone());
        inner.indices.insert(boxed, name);
        name
    }

    /// Look up the string for a [`Name`].
    ///
    /// Returns the empty string for names not minted by this interner.
    pub fn lookup(&self, name: Name) -> String {
        self.inner
            .read()
            .strings
            .get(name.raw() as usize)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check whether only the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}
