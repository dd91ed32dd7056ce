//! Diagnostic collection and rendering.
//!
//! Semantic analysis can report any number of problems before the pipeline
//! gives up, so diagnostics accumulate in a [`Handler`] and are rendered in
//! one batch. Rendering is plain text, anchored to the source: a headline
//! naming the phase, file, line and column, then a three-line context window
//! with a caret under the offending column.

use std::fmt;

use crate::span::{SourceMap, Span};

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that prevents emission.
    Error,
    /// A warning that does not prevent emission.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// The pipeline phase a diagnostic originates from.
///
/// The display form appears verbatim in rendered headlines, e.g.
/// `Names resolution error [main.f12:3:5] : ...`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lexing,
    Parsing,
    Include,
    NamesResolution,
    TypeMismatch,
    Typing,
    Constant,
    InvalidKeyword,
    EntryPoint,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lexing => "Lexing",
            Phase::Parsing => "Parsing",
            Phase::Include => "Include",
            Phase::NamesResolution => "Names resolution",
            Phase::TypeMismatch => "Type mismatch",
            Phase::Typing => "Typing",
            Phase::Constant => "Constant",
            Phase::InvalidKeyword => "Invalid keyword",
            Phase::EntryPoint => "Entry point",
            Phase::Runtime => "Runtime",
        };
        write!(f, "{}", name)
    }
}

/// A single reported problem.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub phase: Phase,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Error,
            phase,
            message: message.into(),
            span,
        }
    }

    pub fn warning(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Warning,
            phase,
            message: message.into(),
            span,
        }
    }

    /// Render this diagnostic with its context window.
    pub fn render(&self, sources: &SourceMap) -> String {
        render_diagnostic(self, sources)
    }
}

/// Handler for collecting diagnostics across the semantic passes.
///
/// # Examples
///
/// ```
/// use f12c_util::{Handler, Phase, Span};
///
/// let mut handler = Handler::new();
/// handler.error(Phase::NamesResolution, "unknown name", Span::new(1, 1));
/// assert!(handler.has_errors());
/// assert_eq!(handler.error_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == Level::Error {
            self.errors += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record an error-level diagnostic.
    pub fn error(&mut self, phase: Phase, message: impl Into<String>, span: Span) {
        self.report(Diagnostic::error(phase, message, span));
    }

    /// True if at least one error has been reported.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Number of error-level diagnostics reported so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// All collected diagnostics, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render every collected diagnostic, separated by blank lines.
    pub fn render_all(&self, sources: &SourceMap) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(sources))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn line_number_prefix(number: u32) -> String {
    format!("{}. ", number)
}

/// Render a diagnostic headline plus a three-line context window.
///
/// The window shows the previous non-empty line, the offending line with a
/// caret under its column, and the next non-empty line. Diagnostics with a
/// dummy span (synthetic nodes, whole-program checks) render the headline
/// only.
pub fn render_diagnostic(diagnostic: &Diagnostic, sources: &SourceMap) -> String {
    let span = diagnostic.span;
    if span.is_dummy() || sources.is_empty() {
        return format!(
            "{} {} : {}",
            diagnostic.phase, diagnostic.level, diagnostic.message
        );
    }

    let file = sources.file(span.file);
    let headline = format!(
        "{} {} [{}:{}:{}] : {}",
        diagnostic.phase, diagnostic.level, file.name, span.line, span.column, diagnostic.message
    );

    let mut lines = vec![headline];

    if span.line > 1 {
        if let Some(prev) = file.line(span.line - 1) {
            if !prev.trim().is_empty() {
                lines.push(format!("{}{}", line_number_prefix(span.line - 1), prev));
            }
        }
    }

    let current = file.line(span.line).unwrap_or("");
    let prefix = line_number_prefix(span.line);
    lines.push(format!("{}{}", prefix, current));

    let caret_offset = prefix.len() + span.column.saturating_sub(1) as usize;
    lines.push(format!("{}^", " ".repeat(caret_offset)));

    if let Some(next) = file.line(span.line + 1) {
        if !next.trim().is_empty() {
            lines.push(format!("{}{}", line_number_prefix(span.line + 1), next));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceMap;

    #[test]
    fn test_handler_counts_errors() {
        let mut handler = Handler::new();
        assert!(!handler.has_errors());

        handler.error(Phase::Lexing, "bad", Span::new(1, 1));
        handler.error(Phase::Typing, "worse", Span::new(2, 1));
        handler.report(Diagnostic::warning(Phase::Typing, "meh", Span::new(3, 1)));

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.diagnostics().len(), 3);
    }

    #[test]
    fn test_render_with_context_window() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("main.f12", "int a = 1;\nint b = x;\nint c = 3;");
        let diag = Diagnostic::error(
            Phase::NamesResolution,
            "Item with name \"x\" is not declared",
            Span::with_file(2, 9, file),
        );

        let rendered = diag.render(&sources);
        let lines: Vec<&str> = rendered.split('\n').collect();

        assert_eq!(
            lines[0],
            "Names resolution error [main.f12:2:9] : Item with name \"x\" is not declared"
        );
        assert_eq!(lines[1], "1. int a = 1;");
        assert_eq!(lines[2], "2. int b = x;");
        // caret sits under column 9 of the source line
        assert_eq!(lines[3], "           ^");
        assert_eq!(lines[4], "3. int c = 3;");
    }

    #[test]
    fn test_render_first_line_has_no_previous() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("main.f12", "0123\nnext");
        let diag = Diagnostic::error(Phase::Lexing, "bad integer", Span::with_file(1, 1, file));

        let rendered = diag.render(&sources);
        assert!(rendered.starts_with("Lexing error [main.f12:1:1] : bad integer"));
        assert!(rendered.contains("1. 0123"));
        assert!(!rendered.contains("0. "));
    }

    #[test]
    fn test_render_dummy_span_headline_only() {
        let sources = SourceMap::new();
        let diag = Diagnostic::error(Phase::EntryPoint, "no main", Span::DUMMY);
        assert_eq!(diag.render(&sources), "Entry point error : no main");
    }

    #[test]
    fn test_blank_neighbours_are_skipped() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("main.f12", "\nint b = x;\n   ");
        let diag = Diagnostic::error(Phase::Typing, "boom", Span::with_file(2, 1, file));

        let rendered = diag.render(&sources);
        assert!(!rendered.contains("1. \n"));
        assert!(!rendered.contains("3. "));
    }
}
