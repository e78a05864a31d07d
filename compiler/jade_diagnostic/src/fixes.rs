//! Structured fix suggestions.
//!
//! A fix pairs a hypothesis-driven description with concrete text edits an
//! IDE can apply without reparsing. Edits are local by construction: insert
//! a cast, insert an import, rename a symbol, qualify a call.

use jade_ir::Span;

use crate::Applicability;

/// A text edit that modifies source code.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TextEdit {
    /// The span to replace (empty span for insert).
    pub span: Span,
    /// The replacement text.
    pub replacement: String,
}

impl TextEdit {
    /// Create a replacement edit.
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        TextEdit {
            span,
            replacement: replacement.into(),
        }
    }

    /// Create an insertion edit at an offset.
    pub fn insert(at: u32, text: impl Into<String>) -> Self {
        TextEdit {
            span: Span::new(at, at),
            replacement: text.into(),
        }
    }

    /// Create a deletion edit.
    pub fn delete(span: Span) -> Self {
        TextEdit {
            span,
            replacement: String::new(),
        }
    }

    pub fn is_insert(&self) -> bool {
        self.span.is_empty() && !self.replacement.is_empty()
    }

    pub fn is_delete(&self) -> bool {
        self.replacement.is_empty() && !self.span.is_empty()
    }
}

/// A ranked fix suggestion.
#[derive(Clone, PartialEq, Debug)]
pub struct FixSuggestion {
    /// Stable identifier, e.g. `"qualify-call"`. Keys the fix-learning
    /// store.
    pub id: String,
    /// User-visible description.
    pub description: String,
    /// Confidence in `[0, 1]`, adjusted by learned acceptance rates.
    pub confidence: f64,
    /// Edits to apply, in source order.
    pub edits: Vec<TextEdit>,
    /// Whether the fix can be auto-applied.
    pub applicability: Applicability,
}

impl FixSuggestion {
    pub fn new(id: impl Into<String>, description: impl Into<String>, confidence: f64) -> Self {
        FixSuggestion {
            id: id.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            edits: Vec::new(),
            applicability: Applicability::Unspecified,
        }
    }

    #[must_use]
    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    #[must_use]
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Scale confidence by a learned acceptance rate.
    #[must_use]
    pub fn adjusted_by(mut self, acceptance_rate: f64) -> Self {
        // Blend rather than replace: a fix with no history keeps its
        // prior.
        self.confidence = (self.confidence * 0.5 + acceptance_rate * 0.5).clamp(0.0, 1.0);
        self
    }
}

/// Sort fixes by descending confidence, ties by id for determinism.
pub(crate) fn rank_fixes(fixes: &mut [FixSuggestion]) {
    fixes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
