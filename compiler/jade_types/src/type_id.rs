//! Type identifier handle.
//!
//! `TypeId` is THE canonical type representation in the dispatch core.
//! Types are stored once in the registry and referenced by their 32-bit
//! index; equality is O(1) index comparison.

use std::fmt;

/// A 32-bit index into the type registry.
///
/// `0` is the reserved invalid id; the registry mints ids starting at 1.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Reserved invalid id. Never refers to a registered type.
    pub const INVALID: TypeId = TypeId(0);

    /// The pre-registered `any` type (top of the subtype lattice).
    pub const ANY: TypeId = TypeId(1);

    /// First id handed out for user-registered types.
    pub const FIRST_USER: u32 = 2;

    /// Create an id from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the registry.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is the reserved invalid id.
    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }

    /// Check if this is the `any` type.
    #[inline]
    pub const fn is_any(self) -> bool {
        self.0 == Self::ANY.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "TypeId::INVALID"),
            Self::ANY => write!(f, "TypeId::ANY"),
            _ => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "<invalid>"),
            Self::ANY => write!(f, "any"),
            _ => write!(f, "type#{}", self.0),
        }
    }
}

// TypeId must be exactly 4 bytes; it is packed into table entries.
const _: () = assert!(std::mem::size_of::<TypeId>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_zero() {
        assert_eq!(TypeId::INVALID.raw(), 0);
        assert!(TypeId::INVALID.is_invalid());
        assert!(!TypeId::ANY.is_invalid());
    }

    #[test]
    fn any_is_one() {
        assert_eq!(TypeId::ANY.raw(), 1);
        assert!(TypeId::ANY.is_any());
    }

    #[test]
    fn type_id_is_copy() {
        let a = TypeId::from_raw(42);
        let b = a;
        assert_eq!(a, b);
    }
}
