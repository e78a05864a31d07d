//! Registry for all types known to a compilation.
//!
//! The `TypeRegistry` mints [`TypeId`]s, records kinds and supertype edges,
//! and answers subtype and specificity-distance queries.
//!
//! # Design
//!
//! - Dual indexing: `Vec` by id (dense) + `BTreeMap` by name (deterministic)
//! - Supertype graph is a DAG; edges that would close a cycle are refused
//! - Distance queries run BFS over supertype edges and are memoized
//! - Shape types additionally admit structural subtyping by field


use std::collections::BTreeMap;
use std::collections::VecDeque;

use jade_ir::Name;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{RegistryError, TypeId, TypeKind};

/// A field of a shape type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeField {
    /// Field name.
    pub name: Name,
    /// Field type.
    pub ty: TypeId,
    /// Whether subtypes must carry this field.
    pub required: bool,
}

impl ShapeField {
    /// Create a required field.
    pub fn required(name: Name, ty: TypeId) -> Self {
        ShapeField {
            name,
            ty,
            required: true,
        }
    }

    /// Create an optional field.
    pub fn optional(name: Name, ty: TypeId) -> Self {
        ShapeField {
            name,
            ty,
            required: false,
        }
    }
}

/// A registered type.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeInfo {
    /// The type name.
    pub name: Name,
    /// The kind of the type.
    pub kind: TypeKind,
    /// Direct supertype edges, sorted and deduplicated.
    pub direct_supertypes: Vec<TypeId>,
    /// Fields, for shape kinds. Empty otherwise.
    pub fields: Vec<ShapeField>,
}

/// Registry of all types in a compilation.
///
/// Append-only during the build phase; immutable afterwards. Queries are
/// memoized, so repeated subtype checks are amortized O(1).
#[derive(Debug)]
pub struct TypeRegistry {
    /// Types indexed by raw id. Slot 0 is a placeholder for the invalid id.
    types: Vec<TypeInfo>,

    /// Types indexed by name (`BTreeMap` for deterministic iteration).
    by_name: BTreeMap<Name, TypeId>,

    /// Memoized specificity distances. `None` means "not a subtype".
    distance_memo: RwLock<FxHashMap<(TypeId, TypeId), Option<u32>>>,

    /// Memoized distance-from-root values.
    root_depth_memo: RwLock<FxHashMap<TypeId, u32>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry with `any` pre-registered as [`TypeId::ANY`].
    pub fn new() -> Self {
        let invalid = TypeInfo {
            name: Name::EMPTY,
            kind: TypeKind::Any,
            direct_supertypes: Vec::new(),
            fields: Vec::new(),
        };
        let any = TypeInfo {
            name: Name::EMPTY,
            kind: TypeKind::Any,
            direct_supertypes: Vec::new(),
            fields: Vec::new(),
        };
        TypeRegistry {
            types: vec![invalid, any],
            by_name: BTreeMap::new(),
            distance_memo: RwLock::new(FxHashMap::default()),
            root_depth_memo: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a nominal type.
    ///
    /// Fails if the name is taken, a supertype is unknown, or the declared
    /// edges would create a cycle.
    pub fn register_type(
        &mut self,
        name: Name,
        kind: TypeKind,
        direct_supertypes: &[TypeId],
    ) -> Result<TypeId, RegistryError> {
        self.register_inner(name, kind, direct_supertypes, Vec::new())
    }

    /// Register a shape type with its fields.
    ///
    /// `kind` must be one of the shape kinds.
    pub fn register_shape(
        &mut self,
        name: Name,
        kind: TypeKind,
        direct_supertypes: &[TypeId],
        fields: Vec<ShapeField>,
    ) -> Result<TypeId, RegistryError> {
        if !kind.is_shape() {
            return Err(RegistryError::NotAShape(TypeId::INVALID));
        }
        self.register_inner(name, kind, direct_supertypes, fields)
    }

    fn register_inner(
        &mut self,
        name: Name,
        kind: TypeKind,
        direct_supertypes: &[TypeId],
        fields: Vec<ShapeField>,
    ) -> Result<TypeId, RegistryError> {
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }

        let new_id = TypeId::from_raw(u32::try_from(self.types.len()).unwrap_or(u32::MAX));

        let mut supers: Vec<TypeId> = Vec::with_capacity(direct_supertypes.len());
        for &sup in direct_supertypes {
            if sup == new_id {
                return Err(RegistryError::CyclicSupertypes {
                    type_id: new_id,
                    through: sup,
                });
            }
            if !self.is_registered(sup) {
                return Err(RegistryError::UnknownSupertype(sup));
            }
            // A freshly minted node has no incoming edges, so edges to
            // existing nodes cannot close a cycle. The reachability check
            // still guards against a caller-predicted self id.
            if self.reaches(sup, new_id) {
                return Err(RegistryError::CyclicSupertypes {
                    type_id: new_id,
                    through: sup,
                });
            }
            supers.push(sup);
        }
        supers.sort_unstable();
        supers.dedup();

        tracing::debug!(?name, %kind, supertypes = supers.len(), "registering type");

        self.types.push(TypeInfo {
            name,
            kind,
            direct_supertypes: supers,
            fields,
        });
        self.by_name.insert(name, new_id);
        Ok(new_id)
    }

    /// Add a supertype edge to an already-registered type.
    ///
    /// Used when declarations arrive out of order. Refuses edges that would
    /// close a cycle.
    pub fn add_supertype(&mut self, sub: TypeId, sup: TypeId) -> Result<(), RegistryError> {
        if !self.is_registered(sub) {
            return Err(RegistryError::UnknownSupertype(sub));
        }
        if !self.is_registered(sup) {
            return Err(RegistryError::UnknownSupertype(sup));
        }
        if sub == sup || self.reaches(sup, sub) {
            return Err(RegistryError::CyclicSupertypes {
                type_id: sub,
                through: sup,
            });
        }

        let info = &mut self.types[sub.raw() as usize];
        if let Err(pos) = info.direct_supertypes.binary_search(&sup) {
            info.direct_supertypes.insert(pos, sup);
        }

        // Reachability changed; previously memoized distances may be stale.
        self.distance_memo.write().clear();
        self.root_depth_memo.write().clear();
        Ok(())
    }

    /// Look up a type by name.
    pub fn lookup(&self, name: Name) -> Option<TypeId> {
        self.by_name.get(&name).copied()
    }

    /// Get the info record for a type.
    ///
    /// Returns `None` for the invalid id and for ids this registry never
    /// minted.
    pub fn type_info(&self, id: TypeId) -> Option<&TypeInfo> {
        if id.is_invalid() {
            return None;
        }
        self.types.get(id.raw() as usize)
    }

    /// Number of registered types, excluding the invalid placeholder.
    pub fn len(&self) -> usize {
        self.types.len() - 1
    }

    /// Check whether only `any` is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 2
    }

    /// Iterate registered ids in minting order, starting at `any`.
    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (1..self.types.len()).map(|raw| TypeId::from_raw(raw as u32))
    }

    /// Check the subtype relation `s ≤ t`.
    pub fn is_subtype(&self, s: TypeId, t: TypeId) -> bool {
        self.specificity_distance(s, t).is_some()
    }

    /// Specificity distance `d(s, t)`.
    ///
    /// The number of edges on the shortest supertype chain from `s` to `t`
    /// if `s ≤ t`, otherwise `None` (∞). `d(s, s) = 0`.
    pub fn specificity_distance(&self, s: TypeId, t: TypeId) -> Option<u32> {
        if !self.is_registered(s) || !self.is_registered(t) {
            return None;
        }
        if s == t {
            return Some(0);
        }

        if let Some(&cached) = self.distance_memo.read().get(&(s, t)) {
            return cached;
        }

        let result = self.compute_distance(s, t);
        self.distance_memo.write().insert((s, t), result);
        result
    }

    /// Shortest distance from `id` to a root of the supertype DAG.
    ///
    /// A root is a type with no direct supertypes. Used by the signature
    /// analyzer's specificity rank and by the implicit distance to `any`.
    pub fn distance_from_root(&self, id: TypeId) -> u32 {
        if !self.is_registered(id) {
            return 0;
        }
        if let Some(&cached) = self.root_depth_memo.read().get(&id) {
            return cached;
        }

        let mut depth = 0;
        let mut frontier = vec![id];
        let mut seen: FxHashSet<TypeId> = frontier.iter().copied().collect();
        loop {
            if frontier
                .iter()
                .any(|&u| self.types[u.raw() as usize].direct_supertypes.is_empty())
            {
                break;
            }
            let mut next = Vec::new();
            for &u in &frontier {
                for &sup in &self.types[u.raw() as usize].direct_supertypes {
                    if seen.insert(sup) {
                        next.push(sup);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
            depth += 1;
        }

        self.root_depth_memo.write().insert(id, depth);
        depth
    }

    fn is_registered(&self, id: TypeId) -> bool {
        !id.is_invalid() && (id.raw() as usize) < self.types.len()
    }

    /// BFS reachability over supertype edges (no structural edges).
    fn reaches(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        let mut queue = VecDeque::from([from]);
        let mut seen = FxHashSet::default();
        seen.insert(from);
        while let Some(u) = queue.pop_front() {
            for &sup in &self.types[u.raw() as usize].direct_supertypes {
                if sup == to {
                    return true;
                }
                if seen.insert(sup) {
                    queue.push_back(sup);
                }
            }
        }
        false
    }

    /// Shortest-chain BFS from `s` toward `t`, with two implicit edge kinds:
    /// every type reaches `any`, and shapes reach structurally-compatible
    /// shapes in one step.
    fn compute_distance(&self, s: TypeId, t: TypeId) -> Option<u32> {
        if t == TypeId::ANY {
            return Some(self.distance_from_root(s) + 1);
        }

        let target_is_shape = self
            .type_info(t)
            .is_some_and(|info| info.kind.is_shape());

        let mut best_structural: Option<u32> = None;
        let mut queue = VecDeque::from([(s, 0u32)]);
        let mut seen = FxHashSet::default();
        seen.insert(s);

        while let Some((u, depth)) = queue.pop_front() {
            if u == t {
                // BFS dequeues in depth order; the nominal hit is minimal
                // unless a structural hop already beat it.
                return Some(best_structural.map_or(depth, |b| b.min(depth)));
            }

            if target_is_shape
                && best_structural.is_none()
                && u != t
                && self.structural_subtype(u, t)
            {
                best_structural = Some(depth + 1);
            }

            if let Some(limit) = best_structural {
                if depth + 1 >= limit {
                    continue;
                }
            }

            for &sup in &self.types[u.raw() as usize].direct_supertypes {
                if seen.insert(sup) {
                    queue.push_back((sup, depth + 1));
                }
            }
        }

        best_structural
    }

    /// Structural shape check: every required field of `t` must appear in
    /// `s` with a subtype-compatible type. Open `t` permits extra fields in
    /// `s`; closed `t` forbids them.
    fn structural_subtype(&self, s: TypeId, t: TypeId) -> bool {
        let (Some(sub), Some(sup)) = (self.type_info(s), self.type_info(t)) else {
            return false;
        };
        if !sub.kind.is_shape() || !sup.kind.is_shape() {
            return false;
        }

        for field in sup.fields.iter().filter(|f| f.required) {
            let Some(mine) = sub.fields.iter().find(|f| f.name == field.name) else {
                return false;
            };
            // Field types reference earlier-minted ids, so this recursion
            // terminates.
            if !self.is_subtype(mine.ty, field.ty) {
                return false;
            }
        }

        if sup.kind == TypeKind::ShapeClosed {
            let allowed: FxHashSet<Name> = sup.fields.iter().map(|f| f.name).collect();
            if sub.fields.iter().any(|f| !allowed.contains(&f.name)) {
                return false;
            }
        }

        true
    }
}
