//! Diagnostic queue: collect, deduplicate, cap, and sort.
//!
//! The driver collects diagnostics from every phase into one queue and
//! flushes them sorted by position for stable output.

use crate::Diagnostic;

/// Queue configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before further errors are dropped
    /// (0 = unlimited).
    pub error_limit: usize,
    /// Deduplicate diagnostics with the same code and primary span.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 20,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// No limits, no dedup (for tests).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Collects diagnostics for one compilation.
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Add a diagnostic.
    ///
    /// Returns `false` if it was dropped by the error limit or as a
    /// duplicate.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        let is_error = diagnostic.is_error();

        if is_error && self.config.error_limit > 0 && self.error_count >= self.config.error_limit {
            return false;
        }

        if self.config.deduplicate {
            let span = diagnostic.primary_span();
            let duplicate = self.diagnostics.iter().any(|existing| {
                existing.code == diagnostic.code
                    && existing.primary_span() == span
                    && existing.message == diagnostic.message
            });
            if duplicate {
                return false;
            }
        }

        if is_error {
            self.error_count += 1;
        } else {
            self.warning_count += 1;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    /// Iterate without draining.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Sort by (file, primary span, code) and drain.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by_key(|diag| {
            let span = diag.primary_span().unwrap_or_default();
            (diag.file, span.start, span.end, diag.code.as_str())
        });
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diagnostics)
    }
}
