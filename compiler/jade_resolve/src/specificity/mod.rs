//! Specificity analysis: select the unique most-specific implementation.
//!
//! Resolution runs in three steps:
//!
//! 1. **Filter** — keep candidates whose arity matches and whose parameter
//!    types admit every argument; the rest are set aside with a structured
//!    [`Rejection`].
//! 2. **Partial order** — `A ≻ B` iff A's per-parameter specificity
//!    distances are all ≤ B's with at least one strictly smaller.
//! 3. **Maxima** — candidates not strictly dominated by any survivor.
//!
//! Zero survivors yield `NoMatch`, one maximum yields `Success`, two or
//! more yield `Ambiguous`. There is no tie-breaking beyond the partial
//! order: `Ambiguous` is a guarantee that the source is under-specified
//! and the user must disambiguate.

#[cfg(test)]
mod tests;

use jade_types::{TypeId, TypeRegistry};
use smallvec::SmallVec;

use crate::{ArgTuple, CallSite, ImplId, Implementation};

/// Why a candidate was set aside during the filter step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rejection {
    /// Arity differs from the call's.
    WrongArity { expected: usize, actual: usize },
    /// An argument is not a subtype of the corresponding parameter.
    TypeMismatchAt {
        index: usize,
        expected: TypeId,
        actual: TypeId,
    },
}

/// Pure outcome of specificity analysis over one candidate set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Exactly one maximum.
    Unique(ImplId),
    /// Two or more maxima; the conflict set, in pool order.
    Ambiguous(Vec<ImplId>),
    /// No candidate survived the filter; every rejection, in input order.
    NoMatch(Vec<(ImplId, Rejection)>),
}

/// Resolution result for a call site.
///
/// A closed tagged variant; consumers must match every arm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionResult {
    /// A unique most-specific implementation was found.
    Success(ImplId),
    /// Multiple maxima; the source requires user disambiguation.
    Ambiguous {
        candidates: Vec<ImplId>,
        argument_types: ArgTuple,
        call_site: CallSite,
    },
    /// No candidate admits the arguments.
    NoMatch {
        rejected: Vec<(ImplId, Rejection)>,
        argument_types: ArgTuple,
        call_site: CallSite,
    },
    /// Invariant violation inside the analyzer. Fatal for the call site,
    /// not for the compilation.
    InternalError { message: String, call_site: CallSite },
}

impl ResolutionResult {
    /// The winning implementation, if resolution succeeded.
    pub fn implementation(&self) -> Option<ImplId> {
        match self {
            ResolutionResult::Success(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success(_))
    }
}

/// Distance vector of one surviving candidate.
struct Survivor<'a> {
    imp: &'a Implementation,
    distances: SmallVec<[u32; 4]>,
}

/// Find the most specific implementations among `impls` for `arg_types`.
///
/// The outcome is deterministic and independent of the order of `impls`:
/// the maxima set is a property of the partial order, and the reported
/// orderings are normalized to pool order.
pub fn find_most_specific(
    registry: &TypeRegistry,
    impls: &[&Implementation],
    arg_types: &[TypeId],
) -> Outcome {
    let mut survivors: Vec<Survivor<'_>> = Vec::with_capacity(impls.len());
    let mut rejected: Vec<(ImplId, Rejection)> = Vec::new();

    for imp in impls {
        match admit(registry, imp, arg_types) {
            Ok(distances) => survivors.push(Survivor { imp, distances }),
            Err(rejection) => rejected.push((imp.id, rejection)),
        }
    }

    if survivors.is_empty() {
        rejected.sort_by_key(|(id, _)| *id);
        return Outcome::NoMatch(rejected);
    }

    // Maxima of the strict domination order.
    let mut maxima: Vec<ImplId> = survivors
        .iter()
        .filter(|candidate| {
            !survivors
                .iter()
                .any(|other| dominates(&other.distances, &candidate.distances))
        })
        .map(|s| s.imp.id)
        .collect();
    maxima.sort_unstable();

    match maxima.as_slice() {
        [single] => Outcome::Unique(*single),
        _ => Outcome::Ambiguous(maxima),
    }
}

/// Step 1 filter: admit `imp` for `arg_types`, or explain the rejection.
fn admit(
    registry: &TypeRegistry,
    imp: &Implementation,
    arg_types: &[TypeId],
) -> Result<SmallVec<[u32; 4]>, Rejection> {
    if imp.arity() != arg_types.len() {
        return Err(Rejection::WrongArity {
            expected: imp.arity(),
            actual: arg_types.len(),
        });
    }

    let mut distances = SmallVec::with_capacity(arg_types.len());
    for (index, (&arg, &param)) in arg_types.iter().zip(&imp.param_types).enumerate() {
        match registry.specificity_distance(arg, param) {
            Some(d) => distances.push(d),
            None => {
                return Err(Rejection::TypeMismatchAt {
                    index,
                    expected: param,
                    actual: arg,
                })
            }
        }
    }
    Ok(distances)
}

/// Strict domination: `a ≻ b` iff every distance in `a` is ≤ the matching
/// distance in `b` and at least one is strictly smaller.
fn dominates(a: &[u32], b: &[u32]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut strict = false;
    for (&da, &db) in a.iter().zip(b) {
        if da > db {
            return false;
        }
        if da < db {
            strict = true;
        }
    }
    strict
}
