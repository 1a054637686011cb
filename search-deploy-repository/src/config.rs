//! Configuration types for the search service connection and the IndexClient.

use std::time::Duration;

use url::Url;

use crate::errors::SearchIndexError;

/// Where the search service lives.
///
/// The same `EndpointConfig` is handed to the provider when it is built and
/// to the deployment orchestrator, which refuses to run when the two differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Base URL of the search service.
    pub url: Url,
    /// Per-request timeout. `None` leaves the transport default.
    pub request_timeout: Option<Duration>,
}

impl EndpointConfig {
    /// Parse an endpoint URL.
    pub fn parse(url: &str) -> Result<Self, SearchIndexError> {
        let url = Url::parse(url)
            .map_err(|e| SearchIndexError::validation(format!("Invalid endpoint '{}': {}", url, e)))?;
        Ok(Self {
            url,
            request_timeout: None,
        })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// The endpoint URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Shard layout for newly created indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }
}

/// Configuration for the IndexClient.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Maximum number of documents sent in a single bulk request. Larger
    /// imports are split into several requests.
    /// Set to None to send every import as one request.
    pub max_batch_size: Option<usize>,
    /// Settings applied to indices created through the client.
    pub index_settings: IndexSettings,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            index_settings: IndexSettings::default(),
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with no batch size limit (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Default::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Default::default()
        }
    }
}
