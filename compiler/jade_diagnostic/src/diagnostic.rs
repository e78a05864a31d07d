//! The layered diagnostic record.

use std::fmt;

use jade_ir::{Name, Span};

use crate::{ErrorCode, FixSuggestion, Hypothesis, TypeFlowChain};

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// How confident a suggestion is, for safe auto-application.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Applicability {
    /// Definitely correct; can be applied without review.
    MachineApplicable,
    /// Probably correct but needs human verification.
    MaybeIncorrect,
    /// Contains placeholders requiring user input.
    HasPlaceholders,
    /// Confidence unknown.
    #[default]
    Unspecified,
}

impl Applicability {
    pub fn is_machine_applicable(&self) -> bool {
        matches!(self, Applicability::MachineApplicable)
    }
}

/// A text substitution inside a suggestion.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Substitution {
    pub span: Span,
    pub snippet: String,
}

impl Substitution {
    pub fn new(span: Span, snippet: impl Into<String>) -> Self {
        Substitution {
            span,
            snippet: snippet.into(),
        }
    }
}

/// A human-readable suggestion with structured substitutions.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Suggestion {
    pub message: String,
    pub substitutions: Vec<Substitution>,
    pub applicability: Applicability,
}

impl Suggestion {
    pub fn new(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
        applicability: Applicability,
    ) -> Self {
        Suggestion {
            message: message.into(),
            substitutions: vec![Substitution::new(span, snippet)],
            applicability,
        }
    }

    /// A suggestion safe to auto-apply.
    pub fn machine_applicable(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
    ) -> Self {
        Self::new(message, span, snippet, Applicability::MachineApplicable)
    }

    /// A suggestion that might be wrong.
    pub fn maybe_incorrect(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
    ) -> Self {
        Self::new(message, span, snippet, Applicability::MaybeIncorrect)
    }
}

/// A labeled span.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// One candidate in the machine payload, with per-argument conversion
/// costs (`None` = no subtype chain exists).
#[derive(Clone, PartialEq, Debug)]
pub struct CandidateInfo {
    /// Rendered signature, e.g. `a::f(int) -> int`.
    pub rendered: String,
    /// Defining module, rendered.
    pub module: String,
    /// Subtype distance from each argument to the parameter.
    pub conversion_costs: Vec<Option<u32>>,
}

/// Machine-readable payload: enough for an IDE or agent to act without
/// re-running resolution.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct MachineData {
    /// Category slug, e.g. `ambiguous_dispatch`.
    pub error_category: String,
    /// Symbols involved (function names, modules, types), rendered.
    pub affected_symbols: Vec<String>,
    /// The scope the failure occurred in, rendered.
    pub scope_context: Option<String>,
    /// Rendered argument types at the call site.
    pub argument_types: Vec<String>,
    /// Candidates with per-argument conversion costs.
    pub candidates: Vec<CandidateInfo>,
}

/// A rich diagnostic with all context for great error messages.
#[derive(Clone, PartialEq, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    pub severity: Severity,
    /// Source file the primary span points into.
    pub file: Name,
    /// Single-line summary.
    pub message: String,
    /// Multi-line explanation.
    pub explanation: String,
    /// Optional educational note about the underlying rule.
    pub educational_note: Option<String>,
    /// Labeled spans.
    pub labels: Vec<Label>,
    /// Plain-text notes.
    pub notes: Vec<String>,
    /// Simple text suggestions.
    pub suggestions: Vec<Suggestion>,
    /// Ranked root-cause hypotheses, most probable first.
    pub hypotheses: Vec<Hypothesis>,
    /// Ranked fix suggestions, most confident first.
    pub fixes: Vec<FixSuggestion>,
    /// Machine payload.
    pub machine: MachineData,
    /// Expected-vs-actual trace for type mismatches.
    pub type_flow: Option<TypeFlowChain>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            file: Name::EMPTY,
            message: String::new(),
            explanation: String::new(),
            educational_note: None,
            labels: Vec::new(),
            notes: Vec::new(),
            suggestions: Vec::new(),
            hypotheses: Vec::new(),
            fixes: Vec::new(),
            machine: MachineData {
                error_category: code.category().to_string(),
                ..MachineData::default()
            },
            type_flow: None,
        }
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    pub fn with_file(mut self, file: Name) -> Self {
        self.file = file;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_educational_note(mut self, note: impl Into<String>) -> Self {
        self.educational_note = Some(note.into());
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        let is_primary = self.labels.is_empty();
        self.labels.push(Label {
            span,
            message: message.into(),
            is_primary,
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    /// Attach hypotheses; they are kept in the given (ranked) order.
    pub fn with_hypotheses(mut self, hypotheses: Vec<Hypothesis>) -> Self {
        self.hypotheses = hypotheses;
        self
    }

    /// Attach a fix; the fix list is kept ranked by confidence.
    pub fn with_fix(mut self, fix: FixSuggestion) -> Self {
        self.fixes.push(fix);
        crate::fixes::rank_fixes(&mut self.fixes);
        self
    }

    pub fn with_machine_data(mut self, machine: MachineData) -> Self {
        self.machine = machine;
        self
    }

    pub fn with_type_flow(mut self, chain: TypeFlowChain) -> Self {
        self.type_flow = Some(chain);
        self
    }

    /// The primary label's span.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.is_primary)
            .map(|label| label.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_sets_fields() {
        let diag = Diagnostic::error(ErrorCode::S1101)
            .with_message("ambiguous call to `f`")
            .with_explanation("two implementations are equally specific")
            .with_label(Span::new(10, 14), "call here")
            .with_label(Span::new(0, 5), "candidate declared here")
            .with_note("candidates come from modules `a` and `b`");

        assert_eq!(diag.code, ErrorCode::S1101);
        assert!(diag.is_error());
        assert_eq!(diag.primary_span(), Some(Span::new(10, 14)));
        assert_eq!(diag.labels.len(), 2);
        assert!(!diag.labels[1].is_primary);
        assert_eq!(diag.machine.error_category, "ambiguous_dispatch");
    }

    #[test]
    fn warning_severity() {
        let diag = Diagnostic::warning(ErrorCode::S1106).with_message("conflict");
        assert!(!diag.is_error());
        assert_eq!(diag.severity.to_string(), "warning");
    }
}
