//! Error codes for dispatch-core diagnostics.
//!
//! Format: prefix letter for the phase, four digits. `S11xx` are semantic
//! resolution errors, `S12xx` registration errors, `S19xx` internal
//! errors; `L10xx` is reserved for the lexical layer, which reports
//! through the same machinery.

use std::fmt;

/// Error codes for all dispatch-core diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Resolution errors (S11xx)
    /// Ambiguous dispatch: two or more maxima survive specificity analysis
    S1101,
    /// No matching implementation for the argument types
    S1102,
    /// Argument type mismatch against every candidate
    S1103,
    /// Wrong number of arguments for every candidate
    S1104,
    /// Unknown function name in scope
    S1105,
    /// Cross-module conflict visible at a call site
    S1106,

    // Registration errors (S12xx)
    /// Supertype edges would create a cycle
    S1201,
    /// Duplicate export of a signature
    S1202,
    /// Import of a signature that is not exported
    S1203,
    /// Import of a module-internal signature
    S1204,
    /// Duplicate implementation in one module
    S1205,

    // Type-flow errors (S13xx)
    /// Expected and actual types diverge along an expression chain
    S1301,

    // Internal errors (S19xx)
    /// Invariant violation inside the resolver
    S1901,
}

impl ErrorCode {
    /// The canonical code string, e.g. `"S1101"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::S1101 => "S1101",
            ErrorCode::S1102 => "S1102",
            ErrorCode::S1103 => "S1103",
            ErrorCode::S1104 => "S1104",
            ErrorCode::S1105 => "S1105",
            ErrorCode::S1106 => "S1106",
            ErrorCode::S1201 => "S1201",
            ErrorCode::S1202 => "S1202",
            ErrorCode::S1203 => "S1203",
            ErrorCode::S1204 => "S1204",
            ErrorCode::S1205 => "S1205",
            ErrorCode::S1301 => "S1301",
            ErrorCode::S1901 => "S1901",
        }
    }

    /// Short description for `--explain`-style consumers.
    pub const fn description(self) -> &'static str {
        match self {
            ErrorCode::S1101 => "ambiguous dispatch: multiple equally specific implementations",
            ErrorCode::S1102 => "no implementation matches the argument types",
            ErrorCode::S1103 => "argument type mismatch",
            ErrorCode::S1104 => "wrong number of arguments",
            ErrorCode::S1105 => "unknown function in scope",
            ErrorCode::S1106 => "conflicting implementations imported from multiple modules",
            ErrorCode::S1201 => "supertype declaration would create a cycle",
            ErrorCode::S1202 => "signature exported twice from one module",
            ErrorCode::S1203 => "imported signature is not exported by the source module",
            ErrorCode::S1204 => "imported signature is module-internal",
            ErrorCode::S1205 => "duplicate implementation for one parameter tuple",
            ErrorCode::S1301 => "expected and actual types diverge",
            ErrorCode::S1901 => "internal resolver error",
        }
    }

    /// The machine-readable error category used in diagnostic payloads.
    pub const fn category(self) -> &'static str {
        match self {
            ErrorCode::S1101 => "ambiguous_dispatch",
            ErrorCode::S1102 => "no_match",
            ErrorCode::S1103 => "type_mismatch",
            ErrorCode::S1104 => "wrong_arity",
            ErrorCode::S1105 => "scope_error",
            ErrorCode::S1106 => "cross_module_conflict",
            ErrorCode::S1201 => "cyclic_supertypes",
            ErrorCode::S1202 => "duplicate_export",
            ErrorCode::S1203 => "signature_not_exported",
            ErrorCode::S1204 => "visibility_violation",
            ErrorCode::S1205 => "duplicate_implementation",
            ErrorCode::S1301 => "type_mismatch",
            ErrorCode::S1901 => "internal_error",
        }
    }

    /// Whether this is a resolution (call-site) error.
    pub const fn is_resolution_error(self) -> bool {
        matches!(
            self,
            ErrorCode::S1101
                | ErrorCode::S1102
                | ErrorCode::S1103
                | ErrorCode::S1104
                | ErrorCode::S1105
                | ErrorCode::S1106
        )
    }

    /// Whether this is a registration error (fatal for the registering
    /// statement only).
    pub const fn is_registration_error(self) -> bool {
        matches!(
            self,
            ErrorCode::S1201
                | ErrorCode::S1202
                | ErrorCode::S1203
                | ErrorCode::S1204
                | ErrorCode::S1205
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
