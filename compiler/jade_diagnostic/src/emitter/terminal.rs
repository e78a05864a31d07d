//! Human-readable terminal output.

use std::io::Write;

use super::{DiagnosticEmitter, SourceMap};
use crate::{Diagnostic, Severity};

/// Terminal emitter with optional ANSI color.
pub struct TerminalEmitter<'a, W: Write> {
    writer: W,
    sources: &'a SourceMap,
    colored: bool,
}

impl<'a, W: Write> TerminalEmitter<'a, W> {
    pub fn new(writer: W, sources: &'a SourceMap) -> Self {
        TerminalEmitter {
            writer,
            sources,
            colored: false,
        }
    }

    /// Enable ANSI color codes.
    #[must_use]
    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    fn severity_prefix(&self, severity: Severity) -> String {
        if !self.colored {
            return severity.to_string();
        }
        let color = match severity {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Note | Severity::Help => "\x1b[1;36m",
        };
        format!("{color}{severity}\x1b[0m")
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<'_, W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        let prefix = self.severity_prefix(diagnostic.severity);
        let _ = writeln!(
            self.writer,
            "{prefix}[{}]: {}",
            diagnostic.code.as_str(),
            diagnostic.message
        );

        let path = self.sources.path(diagnostic.file).to_string();
        for label in &diagnostic.labels {
            let (line, col) = self.sources.line_col(diagnostic.file, label.span.start);
            let marker = if label.is_primary { "-->" } else { "   " };
            let _ = writeln!(
                self.writer,
                "  {marker} {path}:{line}:{col}: {}",
                label.message
            );
        }

        if !diagnostic.explanation.is_empty() {
            for line in diagnostic.explanation.lines() {
                let _ = writeln!(self.writer, "  {line}");
            }
        }

        for note in &diagnostic.notes {
            let _ = writeln!(self.writer, "  note: {note}");
        }

        for suggestion in &diagnostic.suggestions {
            let _ = writeln!(self.writer, "  help: {}", suggestion.message);
        }

        for fix in &diagnostic.fixes {
            let _ = writeln!(
                self.writer,
                "  fix ({:.0}%): {}",
                fix.confidence * 100.0,
                fix.description
            );
        }

        if let Some(note) = &diagnostic.educational_note {
            let _ = writeln!(self.writer, "  = note: {note}");
        }

        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        if error_count == 0 && warning_count == 0 {
            return;
        }
        let _ = writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            error_count, warning_count
        );
    }
}
