//! Search index error types.
//!
//! This module defines the error types that can occur when a request to the
//! search service fails.

use thiserror::Error;

/// Errors that can occur during search service operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Input rejected before any request was sent (e.g., invalid index name).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search service (network, timeout, transport setup).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The search service answered with a non-success status.
    #[error("Remote operation error: {0}")]
    RemoteOperationError(String),

    /// The index the operation targets does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The search service's response could not be understood.
    #[error("Response parse error: {0}")]
    ResponseParseError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a remote operation error.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteOperationError(msg.into())
    }

    /// Create an index not found error.
    pub fn index_not_found(name: impl Into<String>) -> Self {
        Self::IndexNotFound(name.into())
    }

    /// Create a response parse error.
    pub fn response_parse(msg: impl Into<String>) -> Self {
        Self::ResponseParseError(msg.into())
    }
}
