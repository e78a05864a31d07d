//! Incremental build orchestration.
//!
//! Ties the source hasher, dependency tracker, and table cache together:
//! for each signature, compute the build hash of its contributing files,
//! try the cache, and regenerate on a miss. Regeneration is delegated to
//! the caller so this crate never sees the resolver.

use std::path::PathBuf;

use jade_dispatch::DispatchTable;

use crate::{
    BuildHash, CacheError, DependencyTracker, HashError, SourceHasher, TableCache,
};

/// How a table was obtained.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BuildOutcome {
    /// Loaded from the on-disk cache.
    FromCache,
    /// Regenerated and stored.
    Regenerated,
}

/// Drives cache-or-regenerate decisions for one compilation.
#[derive(Debug)]
pub struct IncrementalBuilder {
    cache: TableCache,
    hasher: SourceHasher,
    tracker: DependencyTracker,
}

/// Failure while obtaining a table.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl IncrementalBuilder {
    pub fn new(cache: TableCache, tracker: DependencyTracker) -> Self {
        IncrementalBuilder {
            cache,
            hasher: SourceHasher::new(),
            tracker,
        }
    }

    /// The dependency tracker (for recording edges during registration).
    pub fn tracker_mut(&mut self) -> &mut DependencyTracker {
        &mut self.tracker
    }

    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    /// Build hash over the signature's recorded source files.
    pub fn build_hash_for(&mut self, signature_name: &str) -> Result<BuildHash, HashError> {
        let files: Vec<PathBuf> = self.tracker.files_of(signature_name);
        self.hasher.build_hash(&files)
    }

    /// Load the signature's table from cache, or regenerate and store it.
    ///
    /// `generate` runs only on a miss; its result is persisted before
    /// being returned.
    pub fn get_or_generate(
        &mut self,
        signature_name: &str,
        generate: impl FnOnce() -> DispatchTable,
    ) -> Result<(DispatchTable, BuildOutcome), BuildError> {
        let build_hash = self.build_hash_for(signature_name)?;

        if let Some(table) = self.cache.load(signature_name, build_hash)? {
            tracing::debug!(signature = signature_name, "table loaded from cache");
            return Ok((table, BuildOutcome::FromCache));
        }

        let table = generate();
        self.cache.store(signature_name, build_hash, &table)?;
        tracing::debug!(signature = signature_name, "table regenerated");
        Ok((table, BuildOutcome::Regenerated))
    }
}
