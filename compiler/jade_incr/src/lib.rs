//! Incremental table builds.
//!
//! Generated dispatch tables are cached on disk keyed by a build hash
//! derived from the source files contributing to each signature. A
//! dependency tracker records `source file ↔ signature` edges; on rebuild,
//! only signatures touching changed files are regenerated and everything
//! else loads from cache. Stale or missing entries fall back to
//! regeneration, never to an error.

mod builder;
mod cache;
mod deps;
mod hash;

pub use builder::{BuildError, BuildOutcome, IncrementalBuilder};
pub use cache::{CacheConfig, CacheError, TableCache, CACHE_MAGIC, CACHE_VERSION};
pub use deps::{DependencyTracker, RebuildPlan};
pub use hash::{BuildHash, ContentHash, HashError, SourceHasher};
