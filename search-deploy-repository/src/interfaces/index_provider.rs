//! Index provider trait definition.
//!
//! This module defines the abstract interface for index-level operations,
//! allowing for different backend implementations (OpenSearch, in-memory, etc.).

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::BulkImportResult;
use search_deploy_shared::Document;

/// Abstracts index management and document ingestion on the search service.
///
/// Implementations are injected into `IndexClient`, which adds name validation,
/// bulk batching and diagnostic degradation on top.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations. Every call is a single attempt; no method retries.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// The endpoint URL this provider was built with.
    fn endpoint(&self) -> &str;

    /// Check that the search service answers.
    async fn ping(&self) -> Result<(), SearchIndexError>;

    /// Create an index from a full creation body (settings and mappings).
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the service acknowledged the index
    /// * `Err(SearchIndexError)` - On any non-success response, including an
    ///   index that already exists
    async fn create_index(&self, name: &str, body: &Value) -> Result<(), SearchIndexError>;

    /// Delete an index.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was deleted
    /// * `Err(SearchIndexError::IndexNotFound)` - If the index does not exist
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError>;

    /// Check whether an index exists.
    async fn index_exists(&self, name: &str) -> Result<bool, SearchIndexError>;

    /// Names of every index on the service, system indices included.
    async fn list_indices(&self) -> Result<BTreeSet<String>, SearchIndexError>;

    /// Merge a mapping into an existing index.
    async fn put_mapping(&self, name: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Index documents with a single bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkImportResult)` - One outcome per document, in document order
    /// * `Err(SearchIndexError)` - If the request as a whole failed
    async fn bulk_index(
        &self,
        name: &str,
        documents: &[Document],
    ) -> Result<BulkImportResult, SearchIndexError>;

    /// Make recently indexed documents visible to searches and counts.
    async fn refresh(&self, name: &str) -> Result<(), SearchIndexError>;

    /// Number of visible documents in an index or alias.
    async fn count(&self, name: &str) -> Result<u64, SearchIndexError>;

    /// Raw body of the service's root endpoint.
    async fn service_info(&self) -> Result<String, SearchIndexError>;

    /// Raw, pretty-printed mapping of an index.
    async fn get_mapping(&self, name: &str) -> Result<String, SearchIndexError>;
}
