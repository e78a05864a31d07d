//! Dispatch table data model.
//!
//! A table has two lookup layers: `exact_matches`, strictly sorted by the
//! wyhash of the argument tuple so binary search is well-defined, and an
//! optional decision tree covering subtype cases. The optimizer may add a
//! frequency-ordered `hot_prefix` that is scanned linearly before the
//! binary search; the sorted layer is untouched, so correctness never
//! depends on the prefix.


use jade_resolve::ImplId;
use jade_types::{TypeId, TypeRegistry};

/// One exact-match entry: argument-tuple hash to winning implementation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExactEntry {
    pub arg_hash: u64,
    pub implementation: ImplId,
}

/// Size and shape metadata recorded at generation time.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct TableMetadata {
    /// Estimated resident size of the table in bytes.
    pub memory_bytes: usize,
    /// Depth of the decision tree (0 when absent).
    pub tree_depth: u32,
    /// Estimated fraction of lookups served by the exact layer.
    pub cache_efficiency_estimate: f32,
}

/// A node of the decision tree.
///
/// A traversal visits one node per parameter position. Branches are sorted
/// by `TypeId` so the tree is deterministic given its inputs.
#[derive(Clone, PartialEq, Debug)]
pub struct DecisionNode {
    /// The parameter position this node splits on.
    pub param_index: u32,
    /// Children keyed by the type appearing at `param_index` in some
    /// surviving pattern.
    pub branches: Vec<(TypeId, DecisionNode)>,
    /// The implementation if an exact pattern terminates at this node.
    pub exact_impl: Option<ImplId>,
    /// The most general implementation reachable from this node; used when
    /// the argument is a subtype of this node's type but no more-specific
    /// child matches.
    pub fallback_impl: Option<ImplId>,
}

impl DecisionNode {
    /// A leaf carrying an exact implementation.
    pub fn leaf(param_index: u32, exact_impl: Option<ImplId>, fallback_impl: Option<ImplId>) -> Self {
        DecisionNode {
            param_index,
            branches: Vec::new(),
            exact_impl,
            fallback_impl,
        }
    }

    /// Depth of the subtree rooted here (a lone leaf has depth 1).
    pub fn depth(&self) -> u32 {
        1 + self
            .branches
            .iter()
            .map(|(_, child)| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Total node count of the subtree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self
            .branches
            .iter()
            .map(|(_, child)| child.node_count())
            .sum::<usize>()
    }

    /// Traverse the tree for `args`, yielding a candidate implementation.
    ///
    /// At each node, prefer the exact branch, then the matching branch with
    /// the smallest specificity distance (the deepest descendant that still
    /// admits the argument). The `any` branch has the greatest distance by
    /// construction, so it matches only when nothing nominal does. A miss
    /// below always falls back to this node's `fallback_impl`.
    ///
    /// The result is a *candidate*: a fallback reached through a partial
    /// match may not admit every argument. The dispatch engine verifies
    /// admissibility against the implementation pool before serving it.
    pub fn traverse(&self, registry: &TypeRegistry, args: &[TypeId]) -> Option<ImplId> {
        let index = self.param_index as usize;
        if index >= args.len() {
            return self.exact_impl.or(self.fallback_impl);
        }
        let arg = args[index];

        if let Ok(pos) = self.branches.binary_search_by_key(&arg, |(ty, _)| *ty) {
            let below = self.branches[pos].1.traverse(registry, args);
            return below.or(self.fallback_impl);
        }

        let mut best: Option<(u32, &DecisionNode)> = None;
        for (ty, child) in &self.branches {
            if let Some(distance) = registry.specificity_distance(arg, *ty) {
                let better = best.map_or(true, |(d, _)| distance < d);
                if better {
                    best = Some((distance, child));
                }
            }
        }

        match best {
            Some((_, child)) => child.traverse(registry, args).or(self.fallback_impl),
            None => self.fallback_impl,
        }
    }
}

/// A materialized dispatch table for one signature family.
#[derive(Clone, PartialEq, Debug)]
pub struct DispatchTable {
    /// Hash of the family's signature name.
    pub signature_hash: u64,
    /// Exact-match layer, strictly sorted by `arg_hash`.
    pub exact_matches: Vec<ExactEntry>,
    /// Frequency-ordered prefix scanned before the binary search. Filled
    /// by the optimizer; empty by default.
    pub hot_prefix: Vec<ExactEntry>,
    /// Subtype dispatch layer.
    pub decision_tree: Option<DecisionNode>,
    /// Generation-time metadata.
    pub metadata: TableMetadata,
}

impl DispatchTable {
    /// An empty table: every lookup misses.
    pub fn empty(signature_hash: u64) -> Self {
        DispatchTable {
            signature_hash,
            exact_matches: Vec::new(),
            hot_prefix: Vec::new(),
            decision_tree: None,
            metadata: TableMetadata::default(),
        }
    }

    /// Look up an argument-tuple hash in the exact layer.
    ///
    /// Scans the hot prefix linearly, then binary-searches the sorted
    /// layer.
    pub fn lookup_exact(&self, arg_hash: u64) -> Option<ImplId> {
        for entry in &self.hot_prefix {
            if entry.arg_hash == arg_hash {
                return Some(entry.implementation);
            }
        }
        self.exact_matches
            .binary_search_by_key(&arg_hash, |entry| entry.arg_hash)
            .ok()
            .map(|pos| self.exact_matches[pos].implementation)
    }

    /// Check the strict-ordering invariant of the exact layer.
    pub fn is_well_formed(&self) -> bool {
        self.exact_matches
            .windows(2)
            .all(|pair| pair[0].arg_hash < pair[1].arg_hash)
    }

    /// Recompute size/shape metadata in place.
    pub fn refresh_metadata(&mut self) {
        let tree_nodes = self
            .decision_tree
            .as_ref()
            .map_or(0, DecisionNode::node_count);
        let exact_bytes =
            (self.exact_matches.len() + self.hot_prefix.len()) * std::mem::size_of::<ExactEntry>();
        // Rough per-node footprint: header plus branch vector slot.
        let tree_bytes = tree_nodes * 48;
        self.metadata.memory_bytes = std::mem::size_of::<Self>() + exact_bytes + tree_bytes;
        self.metadata.tree_depth = self
            .decision_tree
            .as_ref()
            .map_or(0, DecisionNode::depth);
    }
}
