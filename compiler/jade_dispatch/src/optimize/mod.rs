//! Table optimization passes.
//!
//! Passes run in priority order over a generated table, using call
//! frequencies sampled by the profiler. Every pass reports a
//! [`PassOutcome`] whether or not it applied. The sorted exact layer is
//! never perturbed; the frequency pass materializes a separate hot prefix
//! that is scanned linearly before the binary search.


use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::table::{DispatchTable, ExactEntry};

/// Exact-entry size rounded into 64-byte cache lines.
const ENTRIES_PER_CACHE_LINE: usize = 4;

/// Sampled call frequencies for one dispatch family, keyed by
/// argument-tuple hash.
#[derive(Clone, Debug, Default)]
pub struct FrequencyProfile {
    counts: FxHashMap<u64, u64>,
}

impl FrequencyProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` calls for an argument-tuple hash.
    pub fn record(&mut self, arg_hash: u64, count: u64) {
        *self.counts.entry(arg_hash).or_insert(0) += count;
    }

    pub fn get(&self, arg_hash: u64) -> u64 {
        self.counts.get(&arg_hash).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Which pass produced an outcome.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PassKind {
    DeadEntryElimination,
    RedundantMerging,
    FrequencyReordering,
    PatternCompression,
    CacheLineAlignment,
}

impl PassKind {
    /// Fixed pass priority; passes run highest first.
    pub const fn priority(self) -> u32 {
        match self {
            PassKind::DeadEntryElimination => 100,
            PassKind::RedundantMerging => 90,
            PassKind::FrequencyReordering => 80,
            PassKind::PatternCompression => 70,
            PassKind::CacheLineAlignment => 60,
        }
    }
}

/// Result of one optimization pass.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PassOutcome {
    pub pass: PassKind,
    pub entries_eliminated: usize,
    pub bytes_saved: usize,
    pub estimated_speedup: f32,
    pub applied: bool,
}

impl PassOutcome {
    fn skipped(pass: PassKind) -> Self {
        PassOutcome {
            pass,
            entries_eliminated: 0,
            bytes_saved: 0,
            estimated_speedup: 0.0,
            applied: false,
        }
    }
}

/// Optimizer configuration.
#[derive(Copy, Clone, Debug)]
pub struct OptimizerConfig {
    /// Maximum entries in the hot prefix.
    pub hot_prefix_len: usize,
    /// Minimum fraction of sampled calls an entry needs to enter the
    /// prefix.
    pub hot_entry_min_fraction: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            hot_prefix_len: 64,
            hot_entry_min_fraction: 0.001,
        }
    }
}

/// Runs the optimization passes over one table.
#[derive(Copy, Clone, Debug, Default)]
pub struct TableOptimizer {
    config: OptimizerConfig,
}

impl TableOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        TableOptimizer { config }
    }

    /// Run all passes in priority order.
    #[tracing::instrument(level = "debug", skip_all, fields(entries = table.exact_matches.len()))]
    pub fn optimize(
        &self,
        table: &mut DispatchTable,
        freq: &FrequencyProfile,
    ) -> Vec<PassOutcome> {
        let outcomes = vec![
            Self::dead_entry_elimination(table, freq),
            Self::redundant_merging(table),
            self.frequency_reordering(table, freq),
            Self::pattern_compression(table),
            Self::cache_line_alignment(table),
        ];
        table.refresh_metadata();
        outcomes
    }

    /// Priority 100: drop entries with zero call frequency over the
    /// sampling window. Skipped when nothing was sampled; an empty profile
    /// would otherwise eliminate the whole table.
    fn dead_entry_elimination(
        table: &mut DispatchTable,
        freq: &FrequencyProfile,
    ) -> PassOutcome {
        if freq.is_empty() {
            return PassOutcome::skipped(PassKind::DeadEntryElimination);
        }

        let before = table.exact_matches.len();
        table.exact_matches.retain(|entry| freq.get(entry.arg_hash) > 0);
        let eliminated = before - table.exact_matches.len();

        PassOutcome {
            pass: PassKind::DeadEntryElimination,
            entries_eliminated: eliminated,
            bytes_saved: eliminated * std::mem::size_of::<ExactEntry>(),
            estimated_speedup: 0.0,
            applied: true,
        }
    }

    /// Priority 90: merge entries whose hash collides to the same
    /// implementation. The sorted layer is deduplicated at generation
    /// time, so this only fires on tables rebuilt from merged inputs.
    fn redundant_merging(table: &mut DispatchTable) -> PassOutcome {
        let before = table.exact_matches.len();
        table
            .exact_matches
            .dedup_by(|a, b| a.arg_hash == b.arg_hash && a.implementation == b.implementation);
        let eliminated = before - table.exact_matches.len();

        PassOutcome {
            pass: PassKind::RedundantMerging,
            entries_eliminated: eliminated,
            bytes_saved: eliminated * std::mem::size_of::<ExactEntry>(),
            estimated_speedup: 0.0,
            applied: true,
        }
    }

    /// Priority 80: materialize the hot prefix from the most frequent
    /// entries. The binary-searched layer keeps its hash order; the prefix
    /// is a parallel view.
    fn frequency_reordering(
        &self,
        table: &mut DispatchTable,
        freq: &FrequencyProfile,
    ) -> PassOutcome {
        let total = freq.total();
        if total == 0 || table.exact_matches.is_empty() {
            return PassOutcome::skipped(PassKind::FrequencyReordering);
        }

        let mut ranked: Vec<(u64, ExactEntry)> = table
            .exact_matches
            .iter()
            .map(|entry| (freq.get(entry.arg_hash), *entry))
            .filter(|(count, _)| {
                #[allow(clippy::cast_precision_loss)]
                let fraction = *count as f32 / total as f32;
                fraction >= self.config.hot_entry_min_fraction
            })
            .collect();
        // Hottest first; ties broken by hash for determinism.
        ranked.sort_by_key(|(count, entry)| (std::cmp::Reverse(*count), entry.arg_hash));
        ranked.truncate(self.config.hot_prefix_len);

        let covered: u64 = ranked.iter().map(|(count, _)| *count).sum();
        table.hot_prefix = ranked.into_iter().map(|(_, entry)| entry).collect();

        #[allow(clippy::cast_precision_loss)]
        let coverage = covered as f32 / total as f32;
        // A prefix hit replaces a binary search; the saving scales with
        // how much of the traffic the prefix covers.
        let estimated_speedup = coverage * 0.6;

        PassOutcome {
            pass: PassKind::FrequencyReordering,
            entries_eliminated: 0,
            bytes_saved: 0,
            estimated_speedup,
            applied: !table.hot_prefix.is_empty(),
        }
    }

    /// Priority 70: report how much the pattern format of the semantic
    /// compressor would save. Eligibility only; the packing itself lives
    /// in [`crate::compress`].
    fn pattern_compression(table: &mut DispatchTable) -> PassOutcome {
        let entries = table.exact_matches.len();
        if entries == 0 {
            return PassOutcome::skipped(PassKind::PatternCompression);
        }
        // Dictionary-index entries take 10 bytes against 16 uncompressed.
        let bytes_saved = entries * (std::mem::size_of::<ExactEntry>() - 10);
        PassOutcome {
            pass: PassKind::PatternCompression,
            entries_eliminated: 0,
            bytes_saved,
            estimated_speedup: 0.0,
            applied: true,
        }
    }

    /// Priority 60: trim the hot prefix to whole cache lines so hot
    /// entries never straddle a line boundary.
    fn cache_line_alignment(table: &mut DispatchTable) -> PassOutcome {
        let len = table.hot_prefix.len();
        if len < ENTRIES_PER_CACHE_LINE {
            return PassOutcome::skipped(PassKind::CacheLineAlignment);
        }
        let aligned = len - (len % ENTRIES_PER_CACHE_LINE);
        let trimmed = len - aligned;
        table.hot_prefix.truncate(aligned);

        PassOutcome {
            pass: PassKind::CacheLineAlignment,
            entries_eliminated: trimmed,
            bytes_saved: trimmed * std::mem::size_of::<ExactEntry>(),
            estimated_speedup: 0.0,
            applied: true,
        }
    }
}

/// Cross-table sharing: families whose tables are isomorphic share one
/// allocation through the `Arc`.
///
/// Safe because tables are immutable after generation. The result maps
/// each family's signature hash to its (possibly shared) table; lookups
/// never consult the stored `signature_hash`, so serving a representative
/// generated for another family is sound. Returns the map and how many
/// families alias an earlier table.
pub fn share_tables(
    tables: Vec<Arc<DispatchTable>>,
) -> (FxHashMap<u64, Arc<DispatchTable>>, usize) {
    let mut representatives: Vec<Arc<DispatchTable>> = Vec::new();
    let mut out = FxHashMap::default();
    let mut shared = 0;
    for table in tables {
        let position = representatives.iter().position(|existing| {
            existing.exact_matches == table.exact_matches
                && existing.decision_tree == table.decision_tree
        });
        match position {
            Some(index) => {
                shared += 1;
                out.insert(table.signature_hash, Arc::clone(&representatives[index]));
            }
            None => {
                representatives.push(Arc::clone(&table));
                out.insert(table.signature_hash, table);
            }
        }
    }
    (out, shared)
}
