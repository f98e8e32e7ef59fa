use std::fmt::{self, Display, Formatter};

use colored::*;
use serde::Serialize;

use crate::rules::values::Span;
use crate::utils::LineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".red().bold()),
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    WrongType,
    MissingKey,
    UnknownKey,
    DuplicateKey,
    InvalidKey,
    Cardinality,
    MissingElement,
    TooManyElements,
    EmptyListOf,
    PatternMismatch,
    NotInSet,
    ForbiddenValue,
    NoAlternativeMatched,
    RecursionLimit,
    UnresolvedRule,
    BuilderFailed,
    DeprecatedBoolean,
}

impl Display for DiagnosticCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// `file:line:col: error[Code]: message`
    pub fn render(&self, index: &LineIndex, file: &str) -> String {
        let (line, col) = index.line_col(self.span.start);
        format!(
            "{}:{}:{}: {}[{}]: {}",
            file, line, col, self.severity, self.code, self.message
        )
    }
}

/// Lengths of both lists at the moment a speculative match started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    errors: usize,
    warnings: usize,
}

///
/// Ordered errors and warnings collected while matching. Speculative attempts
/// take a [`Checkpoint`] first and [`Diagnostics::rollback`] to it when the
/// attempt is abandoned, which truncates both lists back to where they were.
/// Nested attempts compose because a rollback never touches entries recorded
/// before its own checkpoint.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error(&mut self, span: Span, code: DiagnosticCode, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        });
    }

    pub fn warning(&mut self, span: Span, code: DiagnosticCode, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        });
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            errors: self.errors.len(),
            warnings: self.warnings.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.errors.truncate(checkpoint.errors);
        self.warnings.truncate(checkpoint.warnings);
    }

    pub fn has_errors_since(&self, checkpoint: Checkpoint) -> bool {
        self.errors.len() > checkpoint.errors
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errors, self.warnings)
    }
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod diagnostics_tests;
