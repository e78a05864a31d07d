//! Canonical JSON projection of diagnostics.
//!
//! Built by hand to keep the diagnostic crate dependency-light; the shape
//! is the machine interface consumed by IDEs and agents:
//!
//! ```json
//! { "errorCode": "S1101", "severity": "error",
//!   "span": {"file": "...", "start_line": 1, "start_col": 1,
//!            "start_byte": 0, "end_byte": 4},
//!   "message": "...",
//!   "hypotheses": [{"category": "...", "probability": 0.8,
//!                   "explanation": "..."}],
//!   "fixes": [{"id": "...", "description": "...", "confidence": 0.9,
//!              "edits": [{"span": {...}, "replacement": "..."}]}] }
//! ```

use std::io::Write;

use jade_ir::Span;

use super::{escape_json, trailing_comma, DiagnosticEmitter, SourceMap};
use crate::Diagnostic;

/// JSON emitter for machine-readable output.
pub struct JsonEmitter<'a, W: Write> {
    writer: W,
    sources: &'a SourceMap,
    first: bool,
}

impl<'a, W: Write> JsonEmitter<'a, W> {
    pub fn new(writer: W, sources: &'a SourceMap) -> Self {
        JsonEmitter {
            writer,
            sources,
            first: true,
        }
    }

    /// Begin the JSON array output.
    pub fn begin(&mut self) {
        let _ = writeln!(self.writer, "[");
    }

    /// End the JSON array output.
    pub fn end(&mut self) {
        let _ = writeln!(self.writer, "\n]");
    }

    fn write_span(&mut self, file: jade_ir::Name, span: Span, indent: &str) {
        let path = self.sources.path(file).to_string();
        let (line, col) = self.sources.line_col(file, span.start);
        let _ = writeln!(self.writer, "{indent}\"span\": {{");
        let _ = writeln!(self.writer, "{indent}  \"file\": \"{}\",", escape_json(&path));
        let _ = writeln!(self.writer, "{indent}  \"start_line\": {line},");
        let _ = writeln!(self.writer, "{indent}  \"start_col\": {col},");
        let _ = writeln!(self.writer, "{indent}  \"start_byte\": {},", span.start);
        let _ = writeln!(self.writer, "{indent}  \"end_byte\": {}", span.end);
        let _ = write!(self.writer, "{indent}}}");
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<'_, W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        if !self.first {
            let _ = writeln!(self.writer, ",");
        }
        self.first = false;

        let _ = writeln!(self.writer, "  {{");
        let _ = writeln!(
            self.writer,
            "    \"errorCode\": \"{}\",",
            diagnostic.code.as_str()
        );
        let _ = writeln!(
            self.writer,
            "    \"severity\": \"{}\",",
            diagnostic.severity
        );

        let span = diagnostic.primary_span().unwrap_or(Span::DUMMY);
        self.write_span(diagnostic.file, span, "    ");
        let _ = writeln!(self.writer, ",");

        let _ = writeln!(
            self.writer,
            "    \"message\": \"{}\",",
            escape_json(&diagnostic.message)
        );
        let _ = writeln!(
            self.writer,
            "    \"category\": \"{}\",",
            escape_json(&diagnostic.machine.error_category)
        );

        // Argument types and candidates from the machine payload.
        let _ = write!(self.writer, "    \"argumentTypes\": [");
        for (i, ty) in diagnostic.machine.argument_types.iter().enumerate() {
            let _ = write!(
                self.writer,
                "\"{}\"{}",
                escape_json(ty),
                trailing_comma(i, diagnostic.machine.argument_types.len())
            );
        }
        let _ = writeln!(self.writer, "],");

        let _ = writeln!(self.writer, "    \"candidates\": [");
        let candidate_count = diagnostic.machine.candidates.len();
        for (i, candidate) in diagnostic.machine.candidates.iter().enumerate() {
            let _ = writeln!(self.writer, "      {{");
            let _ = writeln!(
                self.writer,
                "        \"signature\": \"{}\",",
                escape_json(&candidate.rendered)
            );
            let _ = writeln!(
                self.writer,
                "        \"module\": \"{}\",",
                escape_json(&candidate.module)
            );
            let _ = write!(self.writer, "        \"conversionCosts\": [");
            for (j, cost) in candidate.conversion_costs.iter().enumerate() {
                match cost {
                    Some(cost) => {
                        let _ = write!(self.writer, "{cost}");
                    }
                    None => {
                        let _ = write!(self.writer, "null");
                    }
                }
                let _ = write!(
                    self.writer,
                    "{}",
                    trailing_comma(j, candidate.conversion_costs.len())
                );
            }
            let _ = writeln!(self.writer, "]");
            let _ = writeln!(self.writer, "      }}{}", trailing_comma(i, candidate_count));
        }
        let _ = writeln!(self.writer, "    ],");

        let _ = writeln!(self.writer, "    \"hypotheses\": [");
        let hypothesis_count = diagnostic.hypotheses.len();
        for (i, hypothesis) in diagnostic.hypotheses.iter().enumerate() {
            let _ = writeln!(self.writer, "      {{");
            let _ = writeln!(
                self.writer,
                "        \"category\": \"{}\",",
                hypothesis.kind.category()
            );
            let _ = writeln!(
                self.writer,
                "        \"probability\": {:.4},",
                hypothesis.probability
            );
            let _ = writeln!(
                self.writer,
                "        \"explanation\": \"{}\"",
                escape_json(&hypothesis.explanation)
            );
            let _ = writeln!(self.writer, "      }}{}", trailing_comma(i, hypothesis_count));
        }
        let _ = writeln!(self.writer, "    ],");

        let _ = writeln!(self.writer, "    \"fixes\": [");
        let fix_count = diagnostic.fixes.len();
        for (i, fix) in diagnostic.fixes.iter().enumerate() {
            let _ = writeln!(self.writer, "      {{");
            let _ = writeln!(self.writer, "        \"id\": \"{}\",", escape_json(&fix.id));
            let _ = writeln!(
                self.writer,
                "        \"description\": \"{}\",",
                escape_json(&fix.description)
            );
            let _ = writeln!(
                self.writer,
                "        \"confidence\": {:.4},",
                fix.confidence
            );
            let _ = writeln!(self.writer, "        \"edits\": [");
            let edit_count = fix.edits.len();
            for (j, edit) in fix.edits.iter().enumerate() {
                let _ = writeln!(self.writer, "          {{");
                let _ = writeln!(
                    self.writer,
                    "            \"span\": {{\"start_byte\": {}, \"end_byte\": {}}},",
                    edit.span.start, edit.span.end
                );
                let _ = writeln!(
                    self.writer,
                    "            \"replacement\": \"{}\"",
                    escape_json(&edit.replacement)
                );
                let _ = writeln!(self.writer, "          }}{}", trailing_comma(j, edit_count));
            }
            let _ = writeln!(self.writer, "        ]");
            let _ = writeln!(self.writer, "      }}{}", trailing_comma(i, fix_count));
        }
        let _ = writeln!(self.writer, "    ]");

        let _ = write!(self.writer, "  }}");
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, _error_count: usize, _warning_count: usize) {
        // The array is the complete machine payload; no summary needed.
    }
}
