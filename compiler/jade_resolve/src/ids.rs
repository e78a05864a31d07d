//! Function and implementation handles.

use std::fmt;

use jade_ir::{ModuleId, Name};

/// Identity of a dispatch family member: simple name plus defining module.
///
/// Two functions with the same `FunctionId` but different parameter types
/// are overloads of one another.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionId {
    /// The unqualified function name.
    pub simple_name: Name,
    /// The module the function is declared in.
    pub module: ModuleId,
}

impl FunctionId {
    pub const fn new(simple_name: Name, module: ModuleId) -> Self {
        FunctionId {
            simple_name,
            module,
        }
    }
}

/// Index of an implementation in the per-compilation [`ImplPool`].
///
/// Tables store these indices rather than pointers, which keeps them
/// position-independent and trivially persistable.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ImplId(u32);

impl ImplId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ImplId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ImplId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImplId({})", self.0)
    }
}

const _: () = assert!(std::mem::size_of::<ImplId>() == 4);
