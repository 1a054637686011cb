//! Diagnostic read errors.
//!
//! Document counts, service status and schema introspection are informational
//! reads. Their failures are reported as a `DiagnosticReadError`, which has no
//! conversion into the mutating error types, so callers must match on the
//! result instead of propagating it.

use std::fmt::Display;

use thiserror::Error;

/// Result of a diagnostic read.
pub type DiagnosticResult<T> = Result<T, DiagnosticReadError>;

/// A diagnostic read that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error: {operation} unavailable: {message}")]
pub struct DiagnosticReadError {
    /// The read that failed, e.g. `document count`.
    pub operation: &'static str,
    /// What went wrong.
    pub message: String,
}

impl DiagnosticReadError {
    pub fn new(operation: &'static str, cause: impl Display) -> Self {
        Self {
            operation,
            message: cause.to_string(),
        }
    }
}
