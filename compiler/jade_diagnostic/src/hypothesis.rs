//! Root-cause hypotheses for resolution failures.
//!
//! The resolution layer computes raw signals (edit distances to visible
//! symbols, subtype distances to near-miss parameters, learned acceptance
//! rates) and turns them into weighted hypotheses; this module owns the
//! types and the normalization/ranking step.

use std::fmt;

/// Categorized guess at the root cause of a failure.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum HypothesisKind {
    /// An implicit conversion would make a candidate match.
    MissingConversion,
    /// The intended implementation lives behind a missing or wrong import.
    WrongImport,
    /// The function name is a misspelling of a visible symbol.
    Typo,
    /// The arguments are in the wrong order.
    WrongArgumentOrder,
    /// The argument types are genuinely wrong.
    TypeMismatch,
    /// The name is not in scope at all.
    ScopeError,
}

impl HypothesisKind {
    /// Category slug for the machine payload.
    pub const fn category(self) -> &'static str {
        match self {
            HypothesisKind::MissingConversion => "missing_conversion",
            HypothesisKind::WrongImport => "wrong_import",
            HypothesisKind::Typo => "typo",
            HypothesisKind::WrongArgumentOrder => "wrong_argument_order",
            HypothesisKind::TypeMismatch => "type_mismatch",
            HypothesisKind::ScopeError => "scope_error",
        }
    }
}

impl fmt::Display for HypothesisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

/// A weighted hypothesis.
#[derive(Clone, PartialEq, Debug)]
pub struct Hypothesis {
    pub kind: HypothesisKind,
    /// Probability in `[0, 1]`; normalized across the set by
    /// [`rank_hypotheses`].
    pub probability: f64,
    /// Human-readable explanation of the evidence.
    pub explanation: String,
}

impl Hypothesis {
    pub fn new(kind: HypothesisKind, weight: f64, explanation: impl Into<String>) -> Self {
        Hypothesis {
            kind,
            probability: weight.max(0.0),
            explanation: explanation.into(),
        }
    }
}

/// Normalize weights into probabilities and sort, most probable first.
///
/// Ties break by category slug so the ranking is deterministic.
pub fn rank_hypotheses(mut hypotheses: Vec<Hypothesis>) -> Vec<Hypothesis> {
    let total: f64 = hypotheses.iter().map(|h| h.probability).sum();
    if total > 0.0 {
        for hypothesis in &mut hypotheses {
            hypothesis.probability /= total;
        }
    }
    hypotheses.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.category().cmp(b.kind.category()))
    });
    hypotheses
}
