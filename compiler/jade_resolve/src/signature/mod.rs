//! Signature analyzer: normalizes declarations into implementation records.
//!
//! The parser layer hands over raw [`FunctionDecl`]s; the analyzer checks
//! per-module uniqueness, computes the deterministic specificity rank, and
//! stores the resulting [`Implementation`] in the per-compilation
//! [`ImplPool`].


use std::fmt;

use jade_ir::{EffectSet, ModuleId, Name, Span};
use jade_types::{TypeId, TypeRegistry};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{ArgTuple, FunctionId, ImplId};

/// A function declaration as produced by the parser layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDecl {
    /// Unqualified function name.
    pub simple_name: Name,
    /// Declaring module.
    pub module: ModuleId,
    /// Declared parameter types, in order.
    pub param_types: Vec<TypeId>,
    /// Declared return type.
    pub return_type: TypeId,
    /// Opaque effect set; recorded, never interpreted.
    pub effects: EffectSet,
    /// Span of the declaration.
    pub span: Span,
}

/// One concrete implementation of a function for a parameter-type tuple.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Implementation {
    /// Pool index of this record.
    pub id: ImplId,
    /// Owning function identity.
    pub function: FunctionId,
    /// Parameter types, in order.
    pub param_types: ArgTuple,
    /// Return type.
    pub return_type: TypeId,
    /// Opaque effect set.
    pub effects: EffectSet,
    /// Declaration span.
    pub span: Span,
    /// Deterministic rank: sum over parameters of kind weight plus
    /// distance-from-root. Informational; resolution never consults it.
    pub specificity_rank: u32,
}

impl Implementation {
    /// Declared arity.
    #[inline]
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

/// Error produced while normalizing a declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignatureError {
    /// The module already has an implementation with this function id and
    /// parameter tuple.
    DuplicateImplementation {
        function: FunctionId,
        param_types: Vec<TypeId>,
        previous: ImplId,
    },
    /// A parameter or return type is not registered.
    UnknownType { decl_name: Name, ty: TypeId },
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::DuplicateImplementation {
                function, previous, ..
            } => write!(
                f,
                "duplicate implementation of {:?} (first declared as {previous:?})",
                function.simple_name
            ),
            SignatureError::UnknownType { decl_name, ty } => {
                write!(f, "declaration {decl_name:?} references unknown type {ty}")
            }
        }
    }
}

impl std::error::Error for SignatureError {}

/// Per-compilation pool of implementation records.
///
/// Owned by the signature analyzer; dispatch tables reference entries by
/// [`ImplId`] index.
#[derive(Debug, Default)]
pub struct ImplPool {
    impls: Vec<Implementation>,
    /// `(function, param tuple)` uniqueness index.
    by_signature: FxHashMap<(FunctionId, ArgTuple), ImplId>,
}

impl ImplPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a declaration and add it to the pool.
    ///
    /// Fails if the declaration references unknown types, or if the module
    /// already has an implementation for the same parameter tuple.
    #[tracing::instrument(level = "debug", skip_all, fields(name = ?decl.simple_name))]
    pub fn register(
        &mut self,
        registry: &TypeRegistry,
        decl: FunctionDecl,
    ) -> Result<ImplId, SignatureError> {
        for &ty in decl.param_types.iter().chain([&decl.return_type]) {
            if registry.type_info(ty).is_none() {
                return Err(SignatureError::UnknownType {
                    decl_name: decl.simple_name,
                    ty,
                });
            }
        }

        let function = FunctionId::new(decl.simple_name, decl.module);
        let param_types: ArgTuple = SmallVec::from_vec(decl.param_types);

        if let Some(&previous) = self.by_signature.get(&(function, param_types.clone())) {
            return Err(SignatureError::DuplicateImplementation {
                function,
                param_types: param_types.into_vec(),
                previous,
            });
        }

        let specificity_rank = param_types
            .iter()
            .map(|&ty| {
                let weight = registry
                    .type_info(ty)
                    .map_or(0, |info| info.kind.weight());
                weight + registry.distance_from_root(ty)
            })
            .sum();

        let id = ImplId::from_raw(u32::try_from(self.impls.len()).unwrap_or(u32::MAX));
        self.by_signature.insert((function, param_types.clone()), id);
        self.impls.push(Implementation {
            id,
            function,
            param_types,
            return_type: decl.return_type,
            effects: decl.effects,
            span: decl.span,
            specificity_rank,
        });
        Ok(id)
    }

    /// Get an implementation by id.
    pub fn get(&self, id: ImplId) -> Option<&Implementation> {
        self.impls.get(id.index())
    }

    /// Number of pooled implementations.
    pub fn len(&self) -> usize {
        self.impls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impls.is_empty()
    }

    /// Iterate all implementations in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &Implementation> {
        self.impls.iter()
    }

    /// All implementations sharing a simple name, across modules.
    pub fn family(&self, simple_name: Name) -> impl Iterator<Item = &Implementation> {
        self.impls
            .iter()
            .filter(move |imp| imp.function.simple_name == simple_name)
    }
}
