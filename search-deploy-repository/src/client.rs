//! Index client implementation.
//!
//! This module provides the main client for index-level operations. The
//! deployment pipeline uses it to create, populate, inspect and delete indices.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::SearchIndexConfig;
use crate::errors::{DiagnosticReadError, DiagnosticResult, SearchIndexError};
use crate::interfaces::IndexProvider;
use crate::opensearch::create_index_body;
use crate::types::BulkImportResult;
use search_deploy_shared::{validate_index_name, Document};

/// Index used by the river plugin for its own bookkeeping.
const RIVER_INDEX: &str = "_river";

/// The main client for index-level operations.
pub struct IndexClient {
    provider: Arc<dyn IndexProvider>,
    config: SearchIndexConfig,
}

impl IndexClient {
    /// Create a new IndexClient with default configuration.
    pub fn new(provider: Arc<dyn IndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new IndexClient with custom configuration.
    pub fn with_config(provider: Arc<dyn IndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    fn validate(name: &str) -> Result<(), SearchIndexError> {
        validate_index_name(name).map_err(|e| SearchIndexError::validation(e.to_string()))
    }

    /// The endpoint the underlying provider talks to.
    pub fn endpoint(&self) -> &str {
        self.provider.endpoint()
    }

    /// Check that the search service answers.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        self.provider.ping().await
    }

    /// Create an index with the given mappings.
    /// Input: index name, index mappings
    /// Output: Result<String, SearchIndexError> (the created index name)
    ///
    /// Any non-success response is an error; a name is only returned for an
    /// index the service acknowledged.
    pub async fn create_index(&self, name: &str, mappings: &Value) -> Result<String, SearchIndexError> {
        Self::validate(name)?;

        let body = create_index_body(&self.config.index_settings, mappings);
        self.provider.create_index(name, &body).await?;

        info!(index = %name, "Created index");
        Ok(name.to_string())
    }

    /// Delete an index.
    pub async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError> {
        Self::validate(name)?;
        self.provider.delete_index(name).await?;
        info!(index = %name, "Deleted index");
        Ok(())
    }

    /// Check whether an index exists.
    pub async fn index_exists(&self, name: &str) -> Result<bool, SearchIndexError> {
        Self::validate(name)?;
        self.provider.index_exists(name).await
    }

    /// List index names, excluding system and river bookkeeping indices.
    pub async fn list_indices(&self) -> Result<BTreeSet<String>, SearchIndexError> {
        let indices = self.provider.list_indices().await?;
        Ok(indices
            .into_iter()
            .filter(|name| name != RIVER_INDEX && !name.starts_with('.'))
            .collect())
    }

    /// Apply the mapping of one resource type to an index.
    ///
    /// Callers applying several resource types handle each result on its own,
    /// so one failing resource does not stop the others.
    pub async fn apply_mapping(
        &self,
        name: &str,
        resource_type: &str,
        mapping: &Value,
    ) -> Result<(), SearchIndexError> {
        Self::validate(name)?;

        match self.provider.put_mapping(name, mapping).await {
            Ok(()) => {
                info!(index = %name, resource_type = %resource_type, "Updated schema");
                Ok(())
            }
            Err(e) => {
                warn!(index = %name, resource_type = %resource_type, error = %e, "Schema update failed");
                Err(e)
            }
        }
    }

    /// Bulk import documents into an index.
    /// Input: index name, documents
    /// Output: Result<BulkImportResult, SearchIndexError>
    ///
    /// Every document is attempted. Imports larger than the configured
    /// max_batch_size are sent as several requests and their outcomes
    /// concatenated in document order. Individual failures are reported in
    /// the result; only a failure of a whole request is an error.
    pub async fn bulk_import(
        &self,
        name: &str,
        documents: &[Document],
    ) -> Result<BulkImportResult, SearchIndexError> {
        Self::validate(name)?;

        if documents.is_empty() {
            return Ok(BulkImportResult::default());
        }

        let chunk_size = self.config.max_batch_size.unwrap_or(documents.len()).max(1);
        let mut parts = Vec::with_capacity(documents.len().div_ceil(chunk_size));
        for chunk in documents.chunks(chunk_size) {
            parts.push(self.provider.bulk_index(name, chunk).await?);
        }

        Ok(BulkImportResult::concat(parts))
    }

    /// Make imported documents visible to counts and searches.
    pub async fn refresh(&self, name: &str) -> Result<(), SearchIndexError> {
        Self::validate(name)?;
        self.provider.refresh(name).await
    }

    /// Number of documents in an index or alias.
    ///
    /// Diagnostic read: failures are returned as a `DiagnosticReadError`.
    pub async fn document_count(&self, name: &str) -> DiagnosticResult<u64> {
        self.provider
            .count(name)
            .await
            .map_err(|e| DiagnosticReadError::new("document count", &e))
    }

    /// Raw status body of the search service.
    ///
    /// Diagnostic read: failures are returned as a `DiagnosticReadError`.
    pub async fn service_status(&self) -> DiagnosticResult<String> {
        self.provider
            .service_info()
            .await
            .map_err(|e| DiagnosticReadError::new("service status", &e))
    }

    /// Raw mapping of an index.
    ///
    /// Diagnostic read: failures are returned as a `DiagnosticReadError`.
    pub async fn index_mapping(&self, name: &str) -> DiagnosticResult<String> {
        self.provider
            .get_mapping(name)
            .await
            .map_err(|e| DiagnosticReadError::new("index mapping", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BulkItemResult;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Mock provider for testing
    struct MockProvider {
        indices: BTreeSet<String>,
        bulk_calls: Mutex<Vec<usize>>,
        created: Mutex<Vec<(String, Value)>>,
        put_mappings: Mutex<Vec<String>>,
        should_fail: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                indices: BTreeSet::new(),
                bulk_calls: Mutex::new(Vec::new()),
                created: Mutex::new(Vec::new()),
                put_mappings: Mutex::new(Vec::new()),
                should_fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }

        fn with_indices(names: &[&str]) -> Self {
            Self {
                indices: names.iter().map(|n| n.to_string()).collect(),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl IndexProvider for MockProvider {
        fn endpoint(&self) -> &str {
            "http://localhost:9200/"
        }

        async fn ping(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn create_index(&self, name: &str, body: &Value) -> Result<(), SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::remote("create index failed with status 400"));
            }
            self.created.lock().await.push((name.to_string(), body.clone()));
            Ok(())
        }

        async fn delete_index(&self, _name: &str) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn index_exists(&self, name: &str) -> Result<bool, SearchIndexError> {
            Ok(self.indices.contains(name))
        }

        async fn list_indices(&self) -> Result<BTreeSet<String>, SearchIndexError> {
            Ok(self.indices.clone())
        }

        async fn put_mapping(&self, name: &str, _mapping: &Value) -> Result<(), SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::remote("put mapping failed with status 400"));
            }
            self.put_mappings.lock().await.push(name.to_string());
            Ok(())
        }

        async fn bulk_index(
            &self,
            _name: &str,
            documents: &[Document],
        ) -> Result<BulkImportResult, SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::connection("connection refused"));
            }
            self.bulk_calls.lock().await.push(documents.len());
            Ok(BulkImportResult::from_results(
                documents
                    .iter()
                    .map(|d| BulkItemResult::succeeded(d.id.clone()))
                    .collect(),
            ))
        }

        async fn refresh(&self, _name: &str) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn count(&self, _name: &str) -> Result<u64, SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::connection("connection refused"));
            }
            Ok(7)
        }

        async fn service_info(&self) -> Result<String, SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::connection("connection refused"));
            }
            Ok(r#"{"cluster_name":"test"}"#.to_string())
        }

        async fn get_mapping(&self, _name: &str) -> Result<String, SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::remote("get mapping failed with status 404"));
            }
            Ok("{}".to_string())
        }
    }

    fn documents(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| Document::from_json(json!({ "id": i.to_string() })).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_index_returns_name() {
        let provider = Arc::new(MockProvider::new());
        let client = IndexClient::new(provider.clone());

        let mappings = json!({ "properties": {} });
        let name = client.create_index("catalog-20240307-090501", &mappings).await.unwrap();

        assert_eq!(name, "catalog-20240307-090501");
        let created = provider.created.lock().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1["mappings"], mappings);
        assert_eq!(created[0].1["settings"]["number_of_shards"], 1);
    }

    #[tokio::test]
    async fn test_create_index_fails_loudly() {
        let client = IndexClient::new(Arc::new(MockProvider::failing()));

        let result = client.create_index("catalog-1", &json!({})).await;
        assert!(matches!(result, Err(SearchIndexError::RemoteOperationError(_))));
    }

    #[tokio::test]
    async fn test_invalid_name_sends_nothing() {
        let provider = Arc::new(MockProvider::new());
        let client = IndexClient::new(provider.clone());

        let result = client.create_index("Catalog", &json!({})).await;

        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
        assert!(provider.created.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_indices_excludes_system() {
        let client = IndexClient::new(Arc::new(MockProvider::with_indices(&[
            "_river",
            ".kibana",
            ".opendistro-job-scheduler-lock",
            "catalog-20240307-090501",
            "catalog-20240308-090501",
        ])));

        let indices: Vec<String> = client.list_indices().await.unwrap().into_iter().collect();
        assert_eq!(
            indices,
            vec!["catalog-20240307-090501", "catalog-20240308-090501"]
        );
    }

    #[tokio::test]
    async fn test_bulk_import_empty() {
        let provider = Arc::new(MockProvider::new());
        let client = IndexClient::new(provider.clone());

        let result = client.bulk_import("catalog-1", &[]).await.unwrap();

        assert_eq!(result.total, 0);
        assert!(result.results.is_empty());
        assert!(provider.bulk_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_import_chunks_by_batch_size() {
        let provider = Arc::new(MockProvider::new());
        let client = IndexClient::with_config(provider.clone(), SearchIndexConfig::with_max_batch_size(4));

        let result = client.bulk_import("catalog-1", &documents(10)).await.unwrap();

        assert_eq!(*provider.bulk_calls.lock().await, vec![4, 4, 2]);
        assert_eq!(result.total, 10);
        assert_eq!(result.succeeded, 10);
        let ids: Vec<_> = result.results.iter().map(|r| r.document_id.clone().unwrap()).collect();
        let expected: Vec<_> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_bulk_import_unlimited_single_request() {
        let provider = Arc::new(MockProvider::new());
        let client = IndexClient::with_config(provider.clone(), SearchIndexConfig::unlimited());

        client.bulk_import("catalog-1", &documents(2500)).await.unwrap();

        assert_eq!(*provider.bulk_calls.lock().await, vec![2500]);
    }

    #[tokio::test]
    async fn test_bulk_import_request_failure_propagates() {
        let client = IndexClient::new(Arc::new(MockProvider::failing()));

        let result = client.bulk_import("catalog-1", &documents(3)).await;
        assert!(matches!(result, Err(SearchIndexError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_apply_mapping_reports_failure() {
        let client = IndexClient::new(Arc::new(MockProvider::failing()));

        let result = client.apply_mapping("catalog-1", "item", &json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_diagnostic_reads_degrade() {
        let client = IndexClient::new(Arc::new(MockProvider::failing()));

        let count = client.document_count("catalog").await;
        let status = client.service_status().await;
        let mapping = client.index_mapping("catalog-1").await;

        assert_eq!(count.unwrap_err().operation, "document count");
        assert_eq!(status.unwrap_err().operation, "service status");
        assert_eq!(mapping.unwrap_err().operation, "index mapping");
    }

    #[tokio::test]
    async fn test_diagnostic_reads_succeed() {
        let client = IndexClient::new(Arc::new(MockProvider::new()));

        assert_eq!(client.document_count("catalog").await, Ok(7));
        assert!(client.service_status().await.unwrap().contains("cluster_name"));
    }
}
