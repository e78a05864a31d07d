//! Diagnostic system for resolution failures.
//!
//! Layered diagnostics: a human message (summary, explanation,
//! suggestions), machine-readable data rich enough for an IDE to generate
//! edits without re-running resolution, ranked root-cause hypotheses, and
//! fix suggestions with structured text edits.
//!
//! This crate owns the primitives; the resolution layer constructs the
//! actual diagnostics from its own context.

pub mod emitter;

mod diagnostic;
mod error_code;
mod fixes;
mod hypothesis;
mod learning;
mod queue;
mod span_utils;
mod suggest;
mod type_flow;

pub use diagnostic::{
    Applicability, CandidateInfo, Diagnostic, Label, MachineData, Severity, Substitution,
    Suggestion,
};
pub use error_code::ErrorCode;
pub use fixes::{FixSuggestion, TextEdit};
pub use hypothesis::{rank_hypotheses, Hypothesis, HypothesisKind};
pub use learning::{FixEvent, FixLearningStore, LearningError};
pub use queue::{DiagnosticConfig, DiagnosticQueue};
pub use span_utils::offset_to_line_col;
pub use suggest::{closest_match, edit_distance};
pub use type_flow::{TypeFlowChain, TypeFlowStep};
