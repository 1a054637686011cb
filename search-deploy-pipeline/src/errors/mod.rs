//! Error types for the search deploy pipeline.

use search_deploy_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can halt a deployment step.
///
/// Diagnostic reads never produce a `DeployError`; they return a
/// `DiagnosticReadError` instead.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The deployment targets a different or unreachable endpoint. Raised
    /// before any mutating step.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A dataset file is not a JSON array of objects.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The alias or index state is inconsistent. Never repaired automatically.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// A request to the search service failed.
    #[error("Remote operation error: {0}")]
    RemoteOperationError(#[from] SearchIndexError),

    /// A dataset file could not be read.
    #[error("IO error: {0}")]
    IoError(String),
}

impl DeployError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an integrity error.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityError(msg.into())
    }

    /// Create an IO error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }
}
