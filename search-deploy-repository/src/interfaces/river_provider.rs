//! River provider trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;

/// Abstracts the river (secondary ingestion pipeline) resources of the search service.
#[async_trait]
pub trait RiverProvider: Send + Sync {
    /// Create or replace a river's `_meta` document.
    async fn put_river(&self, name: &str, meta: &Value) -> Result<(), SearchIndexError>;

    /// Delete a river.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the river existed and was deleted
    /// * `Ok(false)` - If there was no such river
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_river(&self, name: &str) -> Result<bool, SearchIndexError>;
}
