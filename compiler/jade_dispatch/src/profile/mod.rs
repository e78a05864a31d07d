//! Dispatch profiling.
//!
//! Records per-family call frequencies and dispatch latencies, identifies
//! hot paths, and produces optimization recommendations consumed by the
//! driver between compilations.

#[cfg(test)]
mod tests;

use rustc_hash::FxHashMap;

use crate::optimize::FrequencyProfile;
use crate::EngineStats;

/// Power-of-two latency histogram: bucket `i` counts dispatches that took
/// `[2^i, 2^(i+1))` nanoseconds (bucket 0 includes 0 and 1 ns).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispatchHistogram {
    buckets: [u64; 32],
}

impl Default for DispatchHistogram {
    fn default() -> Self {
        DispatchHistogram { buckets: [0; 32] }
    }
}

impl DispatchHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, nanos: u64) {
        let index = if nanos <= 1 {
            0
        } else {
            (63 - nanos.leading_zeros()) as usize
        };
        self.buckets[index.min(31)] += 1;
    }

    /// Count in bucket `i`.
    pub fn bucket(&self, index: usize) -> u64 {
        self.buckets.get(index).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }
}

/// One hot call-site pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct HotPath {
    pub signature_hash: u64,
    pub arg_hash: u64,
    pub calls: u64,
    /// Fraction of all recorded dispatches.
    pub fraction: f64,
}

/// Optimization recommendation for the driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Recommendation {
    /// The family's traffic concentrates on few tuples; materialize a hot
    /// prefix via the frequency-reordering pass.
    BuildHotPrefix { signature_hash: u64 },
    /// Inline caches miss too often on this family; raise the capacity
    /// ceiling.
    GrowInlineCache { signature_hash: u64 },
    /// The family's table is large enough for compression to pay off.
    CompressTable { signature_hash: u64 },
}

#[derive(Clone, Debug, Default)]
struct FamilyProfile {
    counts: FxHashMap<u64, u64>,
    total_calls: u64,
    total_nanos: u64,
}

/// Collects dispatch statistics for a compilation.
#[derive(Clone, Debug, Default)]
pub struct Profiler {
    families: FxHashMap<u64, FamilyProfile>,
    histogram: DispatchHistogram,
    total_calls: u64,
    total_nanos: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one dispatch.
    pub fn record_dispatch(&mut self, signature_hash: u64, arg_hash: u64, nanos: u64) {
        let family = self.families.entry(signature_hash).or_default();
        *family.counts.entry(arg_hash).or_insert(0) += 1;
        family.total_calls += 1;
        family.total_nanos += nanos;
        self.histogram.record(nanos);
        self.total_calls += 1;
        self.total_nanos += nanos;
    }

    /// Total recorded dispatches.
    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    /// Mean dispatch latency in nanoseconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_dispatch_nanos(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_nanos as f64 / self.total_calls as f64
    }

    /// The latency histogram.
    pub fn histogram(&self) -> &DispatchHistogram {
        &self.histogram
    }

    /// Frequency profile for one family, for the table optimizer.
    pub fn family_frequency(&self, signature_hash: u64) -> FrequencyProfile {
        let mut profile = FrequencyProfile::new();
        if let Some(family) = self.families.get(&signature_hash) {
            for (&arg_hash, &count) in &family.counts {
                profile.record(arg_hash, count);
            }
        }
        profile
    }

    /// Call-site patterns taking at least `min_fraction` of all traffic,
    /// hottest first.
    pub fn hot_paths(&self, min_fraction: f64) -> Vec<HotPath> {
        if self.total_calls == 0 {
            return Vec::new();
        }
        let mut paths: Vec<HotPath> = Vec::new();
        for (&signature_hash, family) in &self.families {
            for (&arg_hash, &calls) in &family.counts {
                #[allow(clippy::cast_precision_loss)]
                let fraction = calls as f64 / self.total_calls as f64;
                if fraction >= min_fraction {
                    paths.push(HotPath {
                        signature_hash,
                        arg_hash,
                        calls,
                        fraction,
                    });
                }
            }
        }
        paths.sort_by_key(|p| (std::cmp::Reverse(p.calls), p.signature_hash, p.arg_hash));
        paths
    }

    /// Recommendations for the next compilation, in deterministic order.
    pub fn recommendations(&self, engine: &EngineStats) -> Vec<Recommendation> {
        let mut out = Vec::new();
        let mut families: Vec<(&u64, &FamilyProfile)> = self.families.iter().collect();
        families.sort_by_key(|(sig, _)| **sig);

        #[allow(clippy::cast_precision_loss)]
        let cache_rate = if engine.dispatches == 0 {
            1.0
        } else {
            engine.cache_hits as f64 / engine.dispatches as f64
        };

        for (&signature_hash, family) in families {
            if family.total_calls == 0 {
                continue;
            }

            // Traffic concentration over the family's top tuples.
            let mut counts: Vec<u64> = family.counts.values().copied().collect();
            counts.sort_unstable_by(|a, b| b.cmp(a));
            let top: u64 = counts.iter().take(8).sum();
            #[allow(clippy::cast_precision_loss)]
            let concentration = top as f64 / family.total_calls as f64;
            if concentration > 0.5 && family.counts.len() > 8 {
                out.push(Recommendation::BuildHotPrefix { signature_hash });
            }

            if cache_rate < 0.5 && family.counts.len() > 1 {
                out.push(Recommendation::GrowInlineCache { signature_hash });
            }

            if family.counts.len() > 64 {
                out.push(Recommendation::CompressTable { signature_hash });
            }
        }
        out
    }
}
