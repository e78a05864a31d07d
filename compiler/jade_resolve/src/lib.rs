//! Overload resolution for the Jade dispatch core.
//!
//! Three layers live here, consumed in order by the driver:
//!
//! 1. The **signature analyzer** normalizes parser-produced declarations
//!    into [`Implementation`] records held by the [`ImplPool`].
//! 2. The **module dispatcher** tracks per-module exports and imports and
//!    aggregates the candidate set visible at a call site.
//! 3. The **specificity analyzer** selects the unique most-specific
//!    candidate for a call site, or reports exactly why it could not.
//!
//! Resolution is a pure function of the registry, the visible candidate
//! set, and the argument types; candidate input order never changes the
//! outcome.

mod call_site;
mod explain;
mod ids;
mod modules;
mod resolver;
mod signature;
mod specificity;

pub use call_site::{ArgTuple, CallSite};
pub use explain::DiagnosticEngine;
pub use ids::{FunctionId, ImplId};
pub use modules::{
    ConflictPolicy, CrossModuleConflict, ImportMode, ModuleError, ModuleInfo, ModuleRegistry,
    Version, Visibility,
};
pub use resolver::{CallConv, ResolvedCall, Resolver};
pub use signature::{FunctionDecl, ImplPool, Implementation, SignatureError};
pub use specificity::{find_most_specific, Outcome, Rejection, ResolutionResult};
