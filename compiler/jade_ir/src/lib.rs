//! Shared identifiers for the Jade dispatch core.
//!
//! Everything downstream of the parser speaks in the compact handles defined
//! here: byte [`Span`]s, interned [`Name`]s, and [`ModuleId`]s. All handles
//! are 32-bit and `Copy`; equality is index comparison.

mod effects;
mod interner;
mod module_id;
mod name;
mod span;

pub use effects::EffectSet;
pub use interner::Interner;
pub use module_id::ModuleId;
pub use name::Name;
pub use span::{Span, SpanError};
