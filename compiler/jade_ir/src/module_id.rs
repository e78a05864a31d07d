//! Module identifier handle.

use std::fmt;

/// A 32-bit index identifying a registered module.
///
/// Minted by the module dispatcher during the build phase.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Sentinel for "no module" (synthesized call sites).
    pub const NONE: ModuleId = ModuleId(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ModuleId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ModuleId::NONE")
        } else {
            write!(f, "ModuleId({})", self.0)
        }
    }
}

const _: () = assert!(std::mem::size_of::<ModuleId>() == 4);
