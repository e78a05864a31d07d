//! Call-site resolution entry point.
//!
//! Glues the module dispatcher to the specificity analyzer: aggregate the
//! visible candidate set, run the analysis, and wrap the outcome with call
//! site context. A successful resolution also exposes the information
//! codegen needs.


use jade_types::{TypeId, TypeRegistry};

use crate::{
    find_most_specific, CallSite, ImplId, ImplPool, Implementation, ModuleRegistry, Outcome,
    ResolutionResult,
};

/// Calling-convention hint for codegen.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CallConv {
    /// Single visible implementation; the call can be emitted directly.
    Direct,
    /// Polymorphic family; codegen should go through the dispatch table.
    Table,
}

/// What codegen receives for a successfully resolved call site.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ResolvedCall {
    pub implementation: ImplId,
    pub convention: CallConv,
    pub return_type: TypeId,
}

/// Resolves call sites against the registry, pool, and module graph.
///
/// Read-only over all three; resolution is a pure function of its inputs.
#[derive(Copy, Clone)]
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
    pool: &'a ImplPool,
    modules: &'a ModuleRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        pool: &'a ImplPool,
        modules: &'a ModuleRegistry,
    ) -> Self {
        Resolver {
            registry,
            pool,
            modules,
        }
    }

    /// Resolve a call site to an implementation, or explain the failure.
    ///
    /// Never aborts the compilation: failures come back as structured
    /// variants for the diagnostic engine.
    #[tracing::instrument(level = "debug", skip_all, fields(name = ?call_site.function_name, arity = call_site.arity()))]
    pub fn resolve(&self, call_site: &CallSite) -> ResolutionResult {
        let candidate_ids = self
            .modules
            .candidates_for(call_site.scope_module, call_site.function_name);

        let mut impls: Vec<&Implementation> = Vec::with_capacity(candidate_ids.len());
        for id in candidate_ids {
            match self.pool.get(id) {
                Some(imp) => impls.push(imp),
                None => {
                    // A scope binding referencing a nonexistent pool entry
                    // is registry corruption, not a user error.
                    return ResolutionResult::InternalError {
                        message: format!("scope binding references unknown {id:?}"),
                        call_site: call_site.clone(),
                    };
                }
            }
        }

        match find_most_specific(self.registry, &impls, &call_site.argument_types) {
            Outcome::Unique(id) => {
                tracing::trace!(?id, "resolved");
                ResolutionResult::Success(id)
            }
            Outcome::Ambiguous(candidates) => ResolutionResult::Ambiguous {
                candidates,
                argument_types: call_site.argument_types.clone(),
                call_site: call_site.clone(),
            },
            Outcome::NoMatch(rejected) => ResolutionResult::NoMatch {
                rejected,
                argument_types: call_site.argument_types.clone(),
                call_site: call_site.clone(),
            },
        }
    }

    /// Codegen surface for a successful resolution.
    ///
    /// Returns `None` if the result is not a success or the winning id is
    /// (impossibly) absent from the pool.
    pub fn resolved_call(
        &self,
        result: &ResolutionResult,
        call_site: &CallSite,
    ) -> Option<ResolvedCall> {
        let id = result.implementation()?;
        let imp = self.pool.get(id)?;

        let family_size = self
            .modules
            .candidates_for(call_site.scope_module, call_site.function_name)
            .len();
        let convention = if family_size > 1 {
            CallConv::Table
        } else {
            CallConv::Direct
        };

        Some(ResolvedCall {
            implementation: id,
            convention,
            return_type: imp.return_type,
        })
    }
}
