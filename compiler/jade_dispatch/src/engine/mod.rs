//! Runtime dispatch engine.
//!
//! Serves `(signature hash, argument types)` lookups through three layers:
//! the family's inline cache, the exact-match table, and the decision
//! tree. Tree results are candidates and are verified against the
//! implementation pool before being served or cached; a fallback reached
//! through a partial match must still admit every argument.


use std::sync::Arc;

use jade_resolve::{ImplId, ImplPool, Implementation};
use jade_types::{TypeId, TypeRegistry};
use rustc_hash::FxHashMap;

use crate::table::DispatchTable;
use crate::{hash_arg_tuple, InlineCache, InlineCacheConfig};

/// Engine-level counters, one per lookup layer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EngineStats {
    pub dispatches: u64,
    pub cache_hits: u64,
    pub exact_hits: u64,
    pub tree_hits: u64,
    pub misses: u64,
}

/// Runtime dispatch over installed tables.
///
/// Owns the per-family inline caches; tables are shared immutable
/// references installed by the generator.
pub struct DispatchEngine<'a> {
    registry: &'a TypeRegistry,
    pool: &'a ImplPool,
    tables: FxHashMap<u64, Arc<DispatchTable>>,
    caches: FxHashMap<u64, InlineCache>,
    cache_config: InlineCacheConfig,
    stats: EngineStats,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(registry: &'a TypeRegistry, pool: &'a ImplPool) -> Self {
        Self::with_cache_config(registry, pool, InlineCacheConfig::default())
    }

    pub fn with_cache_config(
        registry: &'a TypeRegistry,
        pool: &'a ImplPool,
        cache_config: InlineCacheConfig,
    ) -> Self {
        DispatchEngine {
            registry,
            pool,
            tables: FxHashMap::default(),
            caches: FxHashMap::default(),
            cache_config,
            stats: EngineStats::default(),
        }
    }

    /// Install a generated table for its family.
    pub fn install_table(&mut self, table: Arc<DispatchTable>) {
        self.tables.insert(table.signature_hash, table);
    }

    /// Install a table under an explicit family hash.
    ///
    /// Used for shared tables, where the stored representative may have
    /// been generated for an isomorphic sibling family.
    pub fn install_shared(&mut self, signature_hash: u64, table: Arc<DispatchTable>) {
        self.tables.insert(signature_hash, table);
    }

    /// Get an installed table.
    pub fn table(&self, signature_hash: u64) -> Option<&Arc<DispatchTable>> {
        self.tables.get(&signature_hash)
    }

    /// Look up the implementation for a call.
    ///
    /// Returns `None` on a miss; the caller reports `NoMatch` upstream.
    pub fn dispatch(&mut self, signature_hash: u64, args: &[TypeId]) -> Option<ImplId> {
        self.stats.dispatches += 1;
        let arg_hash = hash_arg_tuple(args);

        let cache_config = self.cache_config;
        let cache = self
            .caches
            .entry(signature_hash)
            .or_insert_with(|| InlineCache::new(cache_config));
        if let Some(found) = cache.lookup(arg_hash) {
            self.stats.cache_hits += 1;
            return Some(found);
        }

        let Some(table) = self.tables.get(&signature_hash) else {
            self.stats.misses += 1;
            return None;
        };

        if let Some(found) = table.lookup_exact(arg_hash) {
            self.stats.exact_hits += 1;
            if let Some(cache) = self.caches.get_mut(&signature_hash) {
                cache.insert(arg_hash, found);
            }
            return Some(found);
        }

        let candidate = table
            .decision_tree
            .as_ref()
            .and_then(|tree| tree.traverse(self.registry, args));
        if let Some(found) = candidate {
            if self.admits(found, args) {
                self.stats.tree_hits += 1;
                if let Some(cache) = self.caches.get_mut(&signature_hash) {
                    cache.insert(arg_hash, found);
                }
                return Some(found);
            }
            tracing::trace!(?found, "tree candidate rejected by verification");
        }

        self.stats.misses += 1;
        None
    }

    /// Counter snapshot.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Inline-cache counter snapshot for one family.
    pub fn cache_stats(&self, signature_hash: u64) -> Option<crate::CacheStats> {
        self.caches.get(&signature_hash).map(InlineCache::stats)
    }

    /// Clear every inline cache (tables stay installed).
    pub fn clear_caches(&mut self) {
        for cache in self.caches.values_mut() {
            cache.clear();
        }
    }

    /// Verify that an implementation admits the argument tuple.
    fn admits(&self, id: ImplId, args: &[TypeId]) -> bool {
        let Some(imp) = self.pool.get(id) else {
            return false;
        };
        admits_impl(self.registry, imp, args)
    }
}

fn admits_impl(registry: &TypeRegistry, imp: &Implementation, args: &[TypeId]) -> bool {
    imp.arity() == args.len()
        && args
            .iter()
            .zip(&imp.param_types)
            .all(|(&arg, &param)| registry.is_subtype(arg, param))
}
