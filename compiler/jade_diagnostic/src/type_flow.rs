//! Expected-vs-actual type flow chains.
//!
//! For type-mismatch diagnostics, the chain traces the expected and actual
//! types through the recorded expression steps. The divergence point is
//! the first step where they disagree; the suggested fix location is the
//! step before it, where the wrong value entered the flow.

use jade_ir::Span;

/// One recorded expression step.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeFlowStep {
    /// What the step is, rendered (e.g. `"argument 0 of add"`).
    pub description: String,
    /// Expected type, rendered.
    pub expected: String,
    /// Actual type, rendered.
    pub actual: String,
    /// Where the step occurs.
    pub span: Span,
}

impl TypeFlowStep {
    pub fn new(
        description: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        span: Span,
    ) -> Self {
        TypeFlowStep {
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
            span,
        }
    }

    /// Whether expected and actual agree at this step.
    pub fn agrees(&self) -> bool {
        self.expected == self.actual
    }
}

/// An ordered chain of type flow steps.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TypeFlowChain {
    pub steps: Vec<TypeFlowStep>,
}

impl TypeFlowChain {
    pub fn new(steps: Vec<TypeFlowStep>) -> Self {
        TypeFlowChain { steps }
    }

    /// Index of the first step where expected and actual diverge.
    pub fn divergence_point(&self) -> Option<usize> {
        self.steps.iter().position(|step| !step.agrees())
    }

    /// Where a fix should go: the step before the divergence, or the
    /// diverging step itself when the chain diverges immediately.
    pub fn suggested_fix_location(&self) -> Option<Span> {
        let divergence = self.divergence_point()?;
        let index = divergence.saturating_sub(1);
        self.steps.get(index).map(|step| step.span)
    }
}
