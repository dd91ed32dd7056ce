//! Fatal errors for the lexer and parser entry points.
//!
//! Lexing and parsing stop at the first problem: the entry points return a
//! single [`FatalError`] that unwinds to the driver by ordinary `Result`
//! propagation. Semantic errors go through [`crate::Handler`] instead,
//! because that phase keeps going to report as many problems as it can.

use thiserror::Error;

use crate::diagnostic::{Diagnostic, Phase};
use crate::span::{SourceMap, Span};

/// A fatal, pipeline-aborting error with its origin phase and location.
#[derive(Clone, Debug, Error)]
#[error("{phase} error : {message}")]
pub struct FatalError {
    pub phase: Phase,
    pub message: String,
    pub span: Span,
}

impl FatalError {
    pub fn new(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Self {
            phase,
            message: message.into(),
            span,
        }
    }

    /// Render with the source context window.
    pub fn render(&self, sources: &SourceMap) -> String {
        Diagnostic::from(self.clone()).render(sources)
    }
}

impl From<FatalError> for Diagnostic {
    fn from(err: FatalError) -> Self {
        Diagnostic::error(err.phase, err.message, err.span)
    }
}

/// Result alias for operations that abort on the first error.
pub type FatalResult<T> = Result<T, FatalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceMap;

    #[test]
    fn test_fatal_error_renders_like_a_diagnostic() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("main.f12", "fun main {\n    0123;\n}");
        let err = FatalError::new(
            Phase::Lexing,
            "Multi digit integer cannot start with 0",
            Span::with_file(2, 5, file),
        );

        let rendered = err.render(&sources);
        assert!(rendered.starts_with(
            "Lexing error [main.f12:2:5] : Multi digit integer cannot start with 0"
        ));
        assert!(rendered.contains("2.     0123;"));
    }
}
