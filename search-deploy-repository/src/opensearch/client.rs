//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `IndexProvider`
//! using the OpenSearch Rust client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use opensearch::{
    cat::CatIndicesParts,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts,
        IndicesPutMappingParts, IndicesRefreshParts,
    },
    BulkParts, CountParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::config::EndpointConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::IndexProvider;
use crate::opensearch::bulk::{build_bulk_body, parse_bulk_response};
use crate::types::BulkImportResult;
use search_deploy_shared::Document;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use search_deploy_repository::{EndpointConfig, IndexClient, OpenSearchProvider};
///
/// let endpoint = EndpointConfig::parse("http://localhost:9200")?;
/// let provider = Arc::new(OpenSearchProvider::new(&endpoint)?);
/// let client = IndexClient::new(provider.clone());
///
/// let exists = client.index_exists("catalog-20240307-090501").await?;
/// ```
pub struct OpenSearchProvider {
    pub(super) client: OpenSearch,
    endpoint: String,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the configured endpoint.
    ///
    /// No request is sent; use `ping` to check the service is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If transport setup fails
    pub fn new(config: &EndpointConfig) -> Result<Self, SearchIndexError> {
        let conn_pool = SingleNodeConnectionPool::new(config.url.clone());
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %config.url, "Created OpenSearch provider");

        Ok(Self {
            client,
            endpoint: config.as_str().to_string(),
        })
    }
}

/// Turn a non-success response into a `SearchIndexError::RemoteOperationError`.
pub(super) async fn ensure_success(
    response: Response,
    operation: &str,
) -> Result<Response, SearchIndexError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %body, operation, "Request failed");
    Err(SearchIndexError::remote(format!(
        "{} failed with status {}: {}",
        operation,
        status,
        error_reason(&body)
    )))
}

/// Pull the `error` field out of an error response body, falling back to the raw body.
pub(super) fn error_reason(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    match parsed.get("error") {
        Some(Value::String(reason)) => reason.clone(),
        Some(error) => match (error.get("type"), error.get("reason")) {
            (Some(Value::String(kind)), Some(Value::String(reason))) => {
                format!("{}: {}", kind, reason)
            }
            _ => error.to_string(),
        },
        None => body.to_string(),
    }
}

pub(super) fn transport_error(operation: &str, e: opensearch::Error) -> SearchIndexError {
    SearchIndexError::connection(format!("{}: {}", operation, e))
}

#[async_trait]
impl IndexProvider for OpenSearchProvider {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| transport_error("ping", e))?;
        ensure_success(response, "ping").await?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn create_index(&self, name: &str, body: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| transport_error("create index", e))?;

        ensure_success(response, "create index").await?;
        debug!(index = %name, "Index created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| transport_error("delete index", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(SearchIndexError::index_not_found(name));
        }
        ensure_success(response, "delete index").await?;
        debug!(index = %name, "Index deleted");
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| transport_error("index exists", e))?;

        match response.status_code().as_u16() {
            404 => Ok(false),
            _ => ensure_success(response, "index exists").await.map(|_| true),
        }
    }

    async fn list_indices(&self) -> Result<BTreeSet<String>, SearchIndexError> {
        let response = self
            .client
            .cat()
            .indices(CatIndicesParts::None)
            .format("json")
            .send()
            .await
            .map_err(|e| transport_error("list indices", e))?;

        let body: Value = ensure_success(response, "list indices")
            .await?
            .json()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))?;

        let rows = body
            .as_array()
            .ok_or_else(|| SearchIndexError::response_parse("cat indices did not return an array"))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("index").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    #[instrument(skip(self, mapping))]
    async fn put_mapping(&self, name: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[name]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| transport_error("put mapping", e))?;

        ensure_success(response, "put mapping").await?;
        Ok(())
    }

    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    async fn bulk_index(
        &self,
        name: &str,
        documents: &[Document],
    ) -> Result<BulkImportResult, SearchIndexError> {
        let response = self
            .client
            .bulk(BulkParts::Index(name))
            .body(build_bulk_body(documents))
            .send()
            .await
            .map_err(|e| transport_error("bulk index", e))?;

        let body: Value = ensure_success(response, "bulk index")
            .await?
            .json()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))?;

        let result = parse_bulk_response(&body)?;
        if result.total != documents.len() {
            return Err(SearchIndexError::response_parse(format!(
                "bulk response has {} items for {} documents",
                result.total,
                documents.len()
            )));
        }

        debug!(
            succeeded = result.succeeded,
            failed = result.failed,
            "Bulk request completed"
        );
        Ok(result)
    }

    async fn refresh(&self, name: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| transport_error("refresh", e))?;

        ensure_success(response, "refresh").await?;
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64, SearchIndexError> {
        let response = self
            .client
            .count(CountParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| transport_error("count", e))?;

        let body: Value = ensure_success(response, "count")
            .await?
            .json()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))?;

        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| SearchIndexError::response_parse("count response has no 'count'"))
    }

    async fn service_info(&self) -> Result<String, SearchIndexError> {
        let response = self
            .client
            .info()
            .send()
            .await
            .map_err(|e| transport_error("service info", e))?;

        ensure_success(response, "service info")
            .await?
            .text()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))
    }

    async fn get_mapping(&self, name: &str) -> Result<String, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[name]))
            .pretty(true)
            .send()
            .await
            .map_err(|e| transport_error("get mapping", e))?;

        ensure_success(response, "get mapping")
            .await?
            .text()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))
    }
}
