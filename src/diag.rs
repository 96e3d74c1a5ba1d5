//! # Diagnostic engine
//!
//! Collects severity-tagged messages with source locations and stable codes,
//! generalizing the teacher's single `AsmError` struct into the three
//! severities (`error`, `warning`, `note`) and templated messages the BASIC
//! front end and IL codec both need.

use std::fmt;

use crate::source::{SourceLoc, SourceMap, SourceSpan};

/// Severity of a single [`Diagnostic`]. Every diagnostic carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A stable diagnostic identifier, e.g. `B1001` or `ERR_SelectCase_DuplicateElse`.
///
/// Kept as a `&'static str` rather than an enum: the taxonomy in spec.md §6 is
/// an open, append-only set shared between the parser and the analyzer, and a
/// string constant lets both layers declare their own codes without a single
/// central enum growing unboundedly.
pub type Code = &'static str;

/// One diagnostic message: a stable code, severity, rendered text, and the
/// span it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Code,
    pub message: String,
    pub span: SourceSpan,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: Code, message: impl Into<String>, span: SourceSpan) -> Self {
        Self { severity, code, message: message.into(), span }
    }

    pub fn error(code: Code, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(Severity::Error, code, message, span)
    }

    pub fn warning(code: Code, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(Severity::Warning, code, message, span)
    }

    pub fn note(code: Code, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(Severity::Note, code, message, span)
    }

    pub fn at(code: Code, message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::error(code, message, SourceSpan::point(loc))
    }

    /// Renders `file:line:col: severity[code]: message` plus a caret block
    /// when `map` has the referenced file registered.
    pub fn render(&self, map: &SourceMap) -> String {
        let loc = self.span.start;
        let path = map.path(loc.file).unwrap_or("<unknown>");
        let mut out = format!("{path}:{loc}: {}[{}]: {}", self.severity, self.code, self.message);
        let caret = map.render_caret(loc);
        if !caret.is_empty() {
            out.push('\n');
            out.push_str(&caret);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}[{}]: {}", self.span.start, self.severity, self.code, self.message)
    }
}

/// Collects diagnostics emitted over the course of one compilation.
///
/// Shared by the lexer, parser, analyzer, and IL parser so that downstream
/// callers inspect a single error count ("do not lower" per spec.md §7)
/// instead of threading a `Result` through every recursive-descent call.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticEmitter {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diag: Diagnostic) {
        log::debug!("diagnostic: {diag}");
        self.diagnostics.push(diag);
    }

    pub fn error(&mut self, code: Code, message: impl Into<String>, span: SourceSpan) {
        self.emit(Diagnostic::error(code, message, span));
    }

    pub fn warning(&mut self, code: Code, message: impl Into<String>, span: SourceSpan) {
        self.emit(Diagnostic::warning(code, message, span));
    }

    pub fn note(&mut self, code: Code, message: impl Into<String>, span: SourceSpan) {
        self.emit(Diagnostic::note(code, message, span));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    /// `true` when no errors were emitted; a caller must still check this
    /// before lowering even if warnings were emitted (spec.md §7).
    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }

    pub fn extend(&mut self, other: DiagnosticEmitter) {
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileId;

    #[test]
    fn error_count_ignores_warnings_and_notes() {
        let mut emitter = DiagnosticEmitter::new();
        emitter.warning("B2002", "narrowing conversion", SourceSpan::invalid());
        emitter.note("B1001", "see also", SourceSpan::invalid());
        assert_eq!(emitter.error_count(), 0);
        assert!(emitter.is_clean());

        emitter.error("B1001", "unknown variable 'X'", SourceSpan::invalid());
        assert_eq!(emitter.error_count(), 1);
        assert!(!emitter.is_clean());
    }

    #[test]
    fn render_includes_code_and_caret() {
        let mut map = SourceMap::new();
        let file = map.add_file("a.bas", "10 LET X = CUONTER\n");
        let loc = SourceLoc::new(file, 1, 11);
        let diag = Diagnostic::at("B1001", "unknown variable 'CUONTER'", loc);
        let rendered = diag.render(&map);
        assert!(rendered.contains("B1001"));
        assert!(rendered.contains('^'));
    }
}
