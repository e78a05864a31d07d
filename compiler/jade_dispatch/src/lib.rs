//! Dispatch table generation and runtime dispatch.
//!
//! For each hot dispatch family the generator materializes a
//! [`DispatchTable`]: an exact-match table sorted by the 64-bit hash of the
//! argument-type tuple, plus a decision tree over parameter positions for
//! subtype cases. The [`DispatchEngine`] serves lookups through a
//! per-family inline cache, the exact table, and finally the tree; the
//! [`Profiler`] feeds frequencies back into the [`optimize`] passes.
//!
//! Tables are immutable after generation. They store [`ImplId`] indices
//! rather than pointers, which makes them position-independent and
//! trivially persistable through the [`binary`] codec.
//!
//! [`ImplId`]: jade_resolve::ImplId

pub mod binary;
pub mod compress;
pub mod optimize;

mod cache;
mod engine;
mod generator;
mod hash;
mod profile;
mod table;

pub use cache::{CacheStats, InlineCache, InlineCacheConfig};
pub use engine::{DispatchEngine, EngineStats};
pub use generator::{GeneratorConfig, TableGenerator};
pub use hash::{hash_arg_tuple, signature_hash};
pub use profile::{DispatchHistogram, HotPath, Profiler, Recommendation};
pub use table::{DecisionNode, DispatchTable, ExactEntry, TableMetadata};
