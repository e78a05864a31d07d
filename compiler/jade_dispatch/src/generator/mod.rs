//! Dispatch table generation.
//!
//! For a family with enough implementations or observed call sites, the
//! generator enumerates argument-tuple patterns from (a) the registered
//! implementations' parameter tuples and (b) observed call-site tuples,
//! runs the specificity analyzer once per pattern, and materializes the
//! winners into a [`DispatchTable`]. Patterns that resolve ambiguous or
//! empty are omitted; the runtime reports those through the resolver path.
//!
//! Generation is deterministic: patterns are processed in sorted order and
//! every layer of the output is sorted, so identical inputs yield
//! byte-identical tables.


use jade_resolve::{find_most_specific, ArgTuple, ImplId, ImplPool, Implementation, Outcome};
use jade_types::{TypeId, TypeRegistry};

use crate::table::{DecisionNode, DispatchTable, ExactEntry};
use crate::{hash_arg_tuple, signature_hash};

/// Thresholds controlling which families get tables.
#[derive(Copy, Clone, Debug)]
pub struct GeneratorConfig {
    /// Generate when a family has at least this many implementations.
    pub min_impls: usize,
    /// Or when at least this many call sites were observed.
    pub min_call_sites: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            min_impls: 2,
            min_call_sites: 4,
        }
    }
}

/// Materializes dispatch tables for signature families.
#[derive(Copy, Clone)]
pub struct TableGenerator<'a> {
    registry: &'a TypeRegistry,
    pool: &'a ImplPool,
    config: GeneratorConfig,
}

impl<'a> TableGenerator<'a> {
    pub fn new(registry: &'a TypeRegistry, pool: &'a ImplPool, config: GeneratorConfig) -> Self {
        TableGenerator {
            registry,
            pool,
            config,
        }
    }

    /// Whether a family crosses the generation thresholds.
    pub fn should_generate(&self, impls: &[&Implementation], observed: &[ArgTuple]) -> bool {
        impls.len() >= self.config.min_impls || observed.len() >= self.config.min_call_sites
    }

    /// Generate the table for one family.
    ///
    /// A family with no implementations yields an empty table: all lookups
    /// miss.
    #[tracing::instrument(level = "debug", skip_all, fields(name = signature_name, impls = impls.len(), observed = observed.len()))]
    pub fn generate(
        &self,
        signature_name: &str,
        impls: &[&Implementation],
        observed: &[ArgTuple],
    ) -> DispatchTable {
        let sig_hash = signature_hash(signature_name);
        if impls.is_empty() {
            return DispatchTable::empty(sig_hash);
        }

        // Enumerate patterns in sorted order so generation is deterministic
        // regardless of registration or observation order.
        let mut patterns: Vec<ArgTuple> = impls
            .iter()
            .map(|imp| imp.param_types.clone())
            .chain(observed.iter().cloned())
            .collect();
        patterns.sort();
        patterns.dedup();

        let mut resolved: Vec<(ArgTuple, ImplId)> = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match find_most_specific(self.registry, impls, &pattern) {
                Outcome::Unique(winner) => resolved.push((pattern, winner)),
                Outcome::Ambiguous(_) | Outcome::NoMatch(_) => {
                    tracing::trace!(?pattern, "pattern omitted from table");
                }
            }
        }

        let mut exact_matches: Vec<ExactEntry> = resolved
            .iter()
            .map(|(pattern, winner)| ExactEntry {
                arg_hash: hash_arg_tuple(pattern),
                implementation: *winner,
            })
            .collect();
        exact_matches.sort_by_key(|entry| entry.arg_hash);
        // Distinct patterns produce distinct hashes by construction.
        exact_matches.dedup_by_key(|entry| entry.arg_hash);

        let decision_tree = if resolved.is_empty() {
            None
        } else {
            Some(self.build_node(&resolved, 0))
        };

        let exact_hits = observed
            .iter()
            .filter(|tuple| {
                let hash = hash_arg_tuple(tuple);
                exact_matches
                    .binary_search_by_key(&hash, |entry| entry.arg_hash)
                    .is_ok()
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let cache_efficiency_estimate = if observed.is_empty() {
            1.0
        } else {
            exact_hits as f32 / observed.len() as f32
        };

        let mut table = DispatchTable {
            signature_hash: sig_hash,
            exact_matches,
            hot_prefix: Vec::new(),
            decision_tree,
            metadata: crate::table::TableMetadata {
                memory_bytes: 0,
                tree_depth: 0,
                cache_efficiency_estimate,
            },
        };
        table.refresh_metadata();
        table
    }

    /// Build the decision node splitting on `depth`, over the resolved
    /// patterns whose prefixes led here.
    fn build_node(&self, subset: &[(ArgTuple, ImplId)], depth: usize) -> DecisionNode {
        // The exact pattern terminating at this node, if any.
        let exact_impl = subset
            .iter()
            .find(|(pattern, _)| pattern.len() == depth)
            .map(|(_, winner)| *winner);

        // Most general winner reachable from here: minimal specificity
        // rank, ties broken by pool order.
        let fallback_impl = subset
            .iter()
            .map(|(_, winner)| *winner)
            .min_by_key(|id| {
                let rank = self.pool.get(*id).map_or(0, |imp| imp.specificity_rank);
                (rank, *id)
            });

        // Group deeper patterns by their type at this position.
        let mut keys: Vec<TypeId> = subset
            .iter()
            .filter(|(pattern, _)| pattern.len() > depth)
            .map(|(pattern, _)| pattern[depth])
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let branches = keys
            .into_iter()
            .map(|key| {
                let child_subset: Vec<(ArgTuple, ImplId)> = subset
                    .iter()
                    .filter(|(pattern, _)| pattern.len() > depth && pattern[depth] == key)
                    .cloned()
                    .collect();
                (key, self.build_node(&child_subset, depth + 1))
            })
            .collect();

        DecisionNode {
            param_index: u32::try_from(depth).unwrap_or(u32::MAX),
            branches,
            exact_impl,
            fallback_impl,
        }
    }
}
