//! Opaque effect sets attached to implementations.
//!
//! The dispatch core records effects verbatim and never interprets them;
//! effect checking lives upstream. The named bits cover the classes the
//! parser layer currently produces.

use bitflags::bitflags;

bitflags! {
    /// Effect set attached to an implementation record.
    ///
    /// Carried through resolution untouched and surfaced to codegen with
    /// the winning implementation.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct EffectSet: u32 {
        /// Performs input/output.
        const IO = 1 << 0;
        /// Allocates on the heap.
        const ALLOC = 1 << 1;
        /// May diverge (panic, abort).
        const DIVERGE = 1 << 2;
        /// Reads mutable global state.
        const READS_GLOBAL = 1 << 3;
        /// Writes mutable global state.
        const WRITES_GLOBAL = 1 << 4;
    }
}

impl EffectSet {
    /// The pure (empty) effect set.
    pub const PURE: EffectSet = EffectSet::empty();

    /// Check whether the set is pure.
    #[inline]
    pub fn is_pure(self) -> bool {
        self.is_empty()
    }
}
