//! Diagnostic emitters.
//!
//! Two output formats: human-readable terminal text and the canonical JSON
//! projection for machine consumers (IDEs, agents). Both implement
//! [`DiagnosticEmitter`] and render spans through a [`SourceMap`].

mod json;
mod terminal;


pub use json::JsonEmitter;
pub use terminal::TerminalEmitter;

use std::fmt::Write;

use jade_ir::Name;
use rustc_hash::FxHashMap;

use crate::Diagnostic;

/// Registered source files, keyed by interned file name.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: FxHashMap<Name, SourceFile>,
}

#[derive(Debug)]
struct SourceFile {
    path: String,
    text: String,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file's path and contents.
    pub fn add_file(&mut self, name: Name, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(
            name,
            SourceFile {
                path: path.into(),
                text: text.into(),
            },
        );
    }

    /// The rendered path for a file, `"<unknown>"` when unregistered.
    pub fn path(&self, name: Name) -> &str {
        self.files
            .get(&name)
            .map_or("<unknown>", |file| file.path.as_str())
    }

    /// 1-based line/column for a byte offset, (0, 0) when the file is
    /// unregistered.
    pub fn line_col(&self, name: Name, offset: u32) -> (u32, u32) {
        self.files
            .get(&name)
            .map_or((0, 0), |file| crate::offset_to_line_col(&file.text, offset))
    }
}

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    /// Emit a single diagnostic.
    fn emit(&mut self, diagnostic: &Diagnostic);

    /// Emit multiple diagnostics.
    fn emit_all(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            self.emit(diag);
        }
    }

    /// Flush any buffered output.
    fn flush(&mut self);

    /// Emit a summary of errors/warnings.
    fn emit_summary(&mut self, error_count: usize, warning_count: usize);
}

/// Escape a string for JSON output.
pub(crate) fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}

/// Trailing comma helper for hand-rolled JSON lists.
pub(crate) fn trailing_comma(index: usize, total: usize) -> &'static str {
    if index + 1 < total {
        ","
    } else {
        ""
    }
}
