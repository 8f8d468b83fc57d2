//! The closed error taxonomy of the elaborator, plus the source-attached
//! wrapper used for pretty-printed diagnostics.

use loris_dsl::ast::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Severity of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElabSeverity {
    Warning,
}

/// A non-fatal condition collected during elaboration (e.g. an unguarded
/// `pre`). Fatal conditions are [`ElabError`]s instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElabDiagnostic {
    pub code: String,
    pub severity: ElabSeverity,
    pub message: String,
    pub span: Span,
}

impl ElabDiagnostic {
    pub fn warning(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            code: code.into(),
            severity: ElabSeverity::Warning,
            message: message.into(),
            span,
        }
    }
}

/// The kinds of fatal elaboration failures. The taxonomy is closed; every
/// failure surfaced by this crate is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElabErrorKind {
    /// Identifier, type, enum-constant, or reserved-prefix conflict.
    #[error("Redeclaration: {message}")]
    Redeclaration { message: String },

    /// Identifier or type not in context.
    #[error("Undeclared {what} '{name}'")]
    Undeclared { what: &'static str, name: String },

    /// Shape, arity, or subtype violation.
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    /// A context demanded a compile-time constant and got a non-constant.
    #[error("Expression must be a constant integer: {message}")]
    ConstantRequired { message: String },

    /// A construct the elaborator detects and rejects.
    #[error("{message}")]
    Unsupported { message: String },

    /// A callee not yet elaborated. Refined by the top-level driver into
    /// either a forward-reference report or an undeclared-node report.
    #[error("forward reference to node '{callee}'")]
    ForwardReference { callee: String },

    /// The dependency graph contains a cycle outside `pre`.
    #[error("Cyclic dependency: {cycle}")]
    CyclicDependency { cycle: String },
}

/// A fatal elaboration failure with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ElabError {
    pub kind: ElabErrorKind,
    pub span: Span,
}

impl ElabError {
    pub fn new(kind: ElabErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn redeclaration(span: Span, message: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::Redeclaration {
                message: message.into(),
            },
            span,
        )
    }

    pub fn undeclared(span: Span, what: &'static str, name: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::Undeclared {
                what,
                name: name.into(),
            },
            span,
        )
    }

    pub fn type_mismatch(span: Span, message: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::TypeMismatch {
                message: message.into(),
            },
            span,
        )
    }

    pub fn constant_required(span: Span, message: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::ConstantRequired {
                message: message.into(),
            },
            span,
        )
    }

    pub fn unsupported(span: Span, message: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::Unsupported {
                message: message.into(),
            },
            span,
        )
    }

    pub fn forward_reference(span: Span, callee: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::ForwardReference {
                callee: callee.into(),
            },
            span,
        )
    }

    pub fn cyclic(span: Span, cycle: impl Into<String>) -> Self {
        Self::new(
            ElabErrorKind::CyclicDependency {
                cycle: cycle.into(),
            },
            span,
        )
    }

    pub fn is_forward_reference(&self) -> bool {
        matches!(self.kind, ElabErrorKind::ForwardReference { .. })
    }

    /// Attach source text and filename for miette rendering.
    pub fn with_source_context(self, source: &str, filename: &str) -> SpannedElabError {
        SpannedElabError::new(self, source.to_owned(), filename.to_owned())
    }
}

/// An elaboration error enriched with source text for pretty-printed
/// diagnostics.
#[derive(Debug, Error, Diagnostic)]
#[error("{inner}")]
pub struct SpannedElabError {
    #[source_code]
    pub src: NamedSource<String>,
    pub inner: ElabError,
    #[label("here")]
    pub span: SourceSpan,
}

impl SpannedElabError {
    pub fn new(inner: ElabError, source: String, filename: String) -> Self {
        let span = SourceSpan::new(
            inner.span.start.into(),
            inner.span.end.saturating_sub(inner.span.start),
        );
        Self {
            src: NamedSource::new(filename, source),
            inner,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    #[test]
    fn display_messages() {
        let err = ElabError::undeclared(sp(0, 3), "identifier", "foo");
        assert_eq!(err.to_string(), "Undeclared identifier 'foo'");

        let err = ElabError::unsupported(sp(0, 3), "Fby operator not implemented");
        assert_eq!(err.to_string(), "Fby operator not implemented");

        let err = ElabError::forward_reference(sp(4, 9), "lower");
        assert_eq!(err.to_string(), "forward reference to node 'lower'");
        assert!(err.is_forward_reference());
    }

    #[test]
    fn spanned_wrapper_carries_offsets() {
        let err = ElabError::type_mismatch(sp(5, 10), "bool expected");
        let spanned = err.with_source_context("some source text", "model.lor");
        assert_eq!(spanned.span.offset(), 5);
        assert_eq!(spanned.span.len(), 5);
        assert_eq!(spanned.src.name(), "model.lor");
    }

    #[test]
    fn warning_constructor() {
        let w = ElabDiagnostic::warning("unguarded_pre", "pre without arrow", sp(1, 2));
        assert_eq!(w.severity, ElabSeverity::Warning);
        assert_eq!(w.code, "unguarded_pre");
    }
}
