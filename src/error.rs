use std::fmt;

use thiserror::Error;

/// Byte and line/column range of a token or construct in the input script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

/// An error produced while lexing or parsing the input script.
///
/// Front-end errors are collected rather than aborting the run: a script with
/// a broken command can still have its remaining commands translated.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnterminatedString,
    UnsupportedOperator,

    UnexpectedToken,
    UnexpectedEof,
    ExpectedWord,
    MissingKeyword,
    UnsupportedSyntax,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ERROR (line {}:{}): {}",
            self.span.line, self.span.col, self.message
        )
    }
}

/// Severity of a code-generation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An unsupported construct was skipped (no code emitted for it).
    Warning,
    /// A mistranslation the user must fix (no code emitted for it).
    Error,
}

/// A non-fatal diagnostic produced during code generation.
///
/// Diagnostics never abort generation and never leave the emitted program
/// ill-formed; the construct that provoked one simply produces no code.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// A "not yet implemented" notice for an unsupported construct.
    pub fn nyi(construct: impl fmt::Display) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: format!("NYI: compilation of {construct}"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "bashc: {}: {}", tag, self.message)
    }
}

/// A fatal code-generator error: an invariant of the generator itself was
/// violated. Generation aborts and no output file is produced.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("tried to shrink I/O context below zero size (size {size}, shrink by {by})")]
    IoContextUnderflow { size: usize, by: usize },
}
