// Error types for the evaluation core

use crate::span::Span;
use std::fmt;

/// Broad classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported attribute on a declaration
    Attribute,
    /// Fields exceeded a declared fixed bit size
    Size,
    /// Data source read out of bounds
    Read,
    /// Everything else: undefined identifiers, bad conversions, limits
    Eval,
}

/// Evaluation error with optional source location.
///
/// Line/column are resolved lazily against the declaration source (if the
/// evaluator was given one) so error construction stays cheap.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    pub line: Option<u32>,
    pub col: Option<u32>,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Eval,
            message: message.into(),
            span: None,
            line: None,
            col: None,
        }
    }

    /// Attribute error citing the offending attribute or argument
    pub fn attribute(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ErrorKind::Attribute,
            message: message.into(),
            span: Some(span),
            line: None,
            col: None,
        }
    }

    /// Size error citing the field declaration that caused the overflow
    pub fn size(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ErrorKind::Size,
            message: message.into(),
            span: Some(span),
            line: None,
            col: None,
        }
    }

    /// Create a read-out-of-bounds error
    pub fn read_oob(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Read,
            message: message.into(),
            span: None,
            line: None,
            col: None,
        }
    }

    /// Set span if not already present
    pub fn with_span_if_none(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Compute line/col from source text (if span is set but line/col are not)
    pub fn resolve_location(mut self, source: &str) -> Self {
        if let (Some(span), None) = (&self.span, &self.line) {
            let (line, col) = crate::span::offset_to_line_col(source, span.start);
            self.line = Some(line);
            self.col = Some(col);
        }
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            ErrorKind::Attribute => "attribute error",
            ErrorKind::Size => "size error",
            ErrorKind::Read => "read error",
            ErrorKind::Eval => "eval error",
        };
        match (self.line, self.col) {
            (Some(line), Some(col)) => {
                write!(f, "{} at {}:{}: {}", prefix, line, col, self.message)
            }
            _ => write!(f, "{}: {}", prefix, self.message),
        }
    }
}

impl std::error::Error for EvalError {}
