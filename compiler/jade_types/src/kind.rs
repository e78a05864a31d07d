//! Type kinds and their specificity weights.

use std::fmt;

/// The kind of a registered type.
///
/// Each kind carries a fixed specificity weight used by the signature
/// analyzer when ranking implementations:
/// primitive > shape_closed > shape_open > sum_closed > sum_open > any.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    /// A built-in scalar type with no structure.
    Primitive,
    /// A structural record type permitting extra fields in subtypes.
    ShapeOpen,
    /// A structural record type forbidding extra fields in subtypes.
    ShapeClosed,
    /// A sum type open to new variants.
    SumOpen,
    /// A sum type with a fixed variant set.
    SumClosed,
    /// A generic type parameter placeholder.
    Generic,
    /// The top type; every type is a subtype of `any`.
    Any,
}

impl TypeKind {
    /// Fixed specificity weight for this kind.
    ///
    /// Weights are spaced so that kind ordering dominates small distance
    /// differences when summed into a specificity rank.
    #[inline]
    pub const fn weight(self) -> u32 {
        match self {
            TypeKind::Primitive => 60,
            TypeKind::ShapeClosed => 50,
            TypeKind::ShapeOpen => 40,
            TypeKind::SumClosed => 30,
            TypeKind::SumOpen => 20,
            TypeKind::Generic => 10,
            TypeKind::Any => 0,
        }
    }

    /// Check whether this is a structural shape kind.
    #[inline]
    pub const fn is_shape(self) -> bool {
        matches!(self, TypeKind::ShapeOpen | TypeKind::ShapeClosed)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Primitive => "primitive",
            TypeKind::ShapeOpen => "shape_open",
            TypeKind::ShapeClosed => "shape_closed",
            TypeKind::SumOpen => "sum_open",
            TypeKind::SumClosed => "sum_closed",
            TypeKind::Generic => "generic",
            TypeKind::Any => "any",
        };
        f.write_str(s)
    }
}
