//! Per-family inline caches.
//!
//! Each dispatch family gets a small LRU keyed by argument-tuple hash. A
//! cache starts with a single slot and doubles under miss-rate pressure up
//! to the configured maximum. Statistics are retained for the profiler.

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use jade_resolve::ImplId;
use lru::LruCache;

/// Sizing and resize policy for inline caches.
#[derive(Copy, Clone, Debug)]
pub struct InlineCacheConfig {
    /// Capacity of a fresh cache.
    pub initial_capacity: usize,
    /// Hard capacity ceiling.
    pub max_capacity: usize,
    /// Accesses per resize-decision window.
    pub resize_window: u64,
    /// Miss rate above which a full window doubles the capacity.
    pub resize_miss_rate: f32,
}

impl Default for InlineCacheConfig {
    fn default() -> Self {
        InlineCacheConfig {
            initial_capacity: 1,
            max_capacity: 8,
            resize_window: 100,
            resize_miss_rate: 0.30,
        }
    }
}

/// Counters retained for the profiler.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub resizes: u64,
    pub clears: u64,
}

/// A cached binding with its bookkeeping.
#[derive(Copy, Clone, Debug)]
struct CacheEntry {
    implementation: ImplId,
    hit_count: u64,
    last_access_tick: u64,
}

/// Small per-family LRU keyed by argument-tuple hash.
#[derive(Debug)]
pub struct InlineCache {
    entries: LruCache<u64, CacheEntry>,
    config: InlineCacheConfig,
    stats: CacheStats,
    /// Accesses and misses inside the current resize window.
    window_accesses: u64,
    window_misses: u64,
    /// Monotonic access counter; stamps `last_access_tick`.
    tick: u64,
}

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

impl InlineCache {
    pub fn new(config: InlineCacheConfig) -> Self {
        InlineCache {
            entries: LruCache::new(capacity(config.initial_capacity.max(1))),
            config,
            stats: CacheStats::default(),
            window_accesses: 0,
            window_misses: 0,
            tick: 0,
        }
    }

    /// Look up a binding, updating recency and counters.
    pub fn lookup(&mut self, arg_hash: u64) -> Option<ImplId> {
        self.tick += 1;
        self.window_accesses += 1;

        if let Some(entry) = self.entries.get_mut(&arg_hash) {
            entry.hit_count += 1;
            entry.last_access_tick = self.tick;
            self.stats.hits += 1;
            let found = entry.implementation;
            self.maybe_resize();
            return Some(found);
        }

        self.stats.misses += 1;
        self.window_misses += 1;
        self.maybe_resize();
        None
    }

    /// Insert a binding, evicting the least-recently-used entry if full.
    pub fn insert(&mut self, arg_hash: u64, implementation: ImplId) {
        self.tick += 1;
        let entry = CacheEntry {
            implementation,
            hit_count: 0,
            last_access_tick: self.tick,
        };
        if let Some((evicted_hash, _)) = self.entries.push(arg_hash, entry) {
            if evicted_hash != arg_hash {
                self.stats.evictions += 1;
            }
        }
    }

    /// Drop every entry, keeping capacity and counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.clears += 1;
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Double the capacity when a full window ran too many misses.
    fn maybe_resize(&mut self) {
        if self.window_accesses < self.config.resize_window {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let miss_rate = self.window_misses as f32 / self.window_accesses as f32;
        if miss_rate > self.config.resize_miss_rate && self.capacity() < self.config.max_capacity {
            let doubled = (self.capacity() * 2).min(self.config.max_capacity);
            self.entries.resize(capacity(doubled));
            self.stats.resizes += 1;
            tracing::trace!(capacity = doubled, "inline cache resized");
        }
        self.window_accesses = 0;
        self.window_misses = 0;
    }
}

impl Default for InlineCache {
    fn default() -> Self {
        Self::new(InlineCacheConfig::default())
    }
}
