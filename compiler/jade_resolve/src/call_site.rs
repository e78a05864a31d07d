//! Call-site records handed over by the parser layer.

use jade_ir::{ModuleId, Name, Span};
use jade_types::TypeId;
use smallvec::SmallVec;

/// Argument-type tuple of a call site.
///
/// Call arity is usually ≤ 4; larger tuples spill to the heap.
pub type ArgTuple = SmallVec<[TypeId; 4]>;

/// A textual occurrence of a function call with known argument types.
///
/// Built by the parser layer; the core never mutates call sites.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CallSite {
    /// The called name exactly as it appears in scope (may be an alias or
    /// a qualified spelling).
    pub function_name: Name,
    /// Static types of the arguments, in order.
    pub argument_types: ArgTuple,
    /// Source file of the call, interned.
    pub file: Name,
    /// Byte span of the call expression.
    pub span: Span,
    /// The module whose scope the call resolves in.
    pub scope_module: ModuleId,
}

impl CallSite {
    /// Create a call site record.
    pub fn new(
        function_name: Name,
        argument_types: impl IntoIterator<Item = TypeId>,
        file: Name,
        span: Span,
        scope_module: ModuleId,
    ) -> Self {
        CallSite {
            function_name,
            argument_types: argument_types.into_iter().collect(),
            file,
            span,
            scope_module,
        }
    }

    /// Call arity.
    #[inline]
    pub fn arity(&self) -> usize {
        self.argument_types.len()
    }
}
