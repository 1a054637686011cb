//! Alias operations for the OpenSearch provider.

use async_trait::async_trait;
use opensearch::indices::IndicesGetAliasParts;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::client::{ensure_success, transport_error, OpenSearchProvider};
use crate::errors::SearchIndexError;
use crate::interfaces::AliasProvider;

/// Index names from a get-alias response (`{ "<index>": { "aliases": {...} } }`), sorted.
pub(super) fn alias_targets(body: &Value) -> Result<Vec<String>, SearchIndexError> {
    let indices = body
        .as_object()
        .ok_or_else(|| SearchIndexError::response_parse("get alias did not return an object"))?;

    let mut targets: Vec<String> = indices.keys().cloned().collect();
    targets.sort();
    Ok(targets)
}

impl OpenSearchProvider {
    async fn update_aliases(&self, actions: Value, operation: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        ensure_success(response, operation).await?;
        Ok(())
    }
}

#[async_trait]
impl AliasProvider for OpenSearchProvider {
    async fn get_alias(&self, alias: &str) -> Result<Option<Vec<String>>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| transport_error("get alias", e))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let body: Value = ensure_success(response, "get alias")
            .await?
            .json()
            .await
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))?;

        let targets = alias_targets(&body)?;
        Ok((!targets.is_empty()).then_some(targets))
    }

    #[instrument(skip(self))]
    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), SearchIndexError> {
        self.update_aliases(
            json!([{ "add": { "index": index, "alias": alias } }]),
            "create alias",
        )
        .await?;
        debug!(alias = %alias, index = %index, "Alias created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), SearchIndexError> {
        // Both actions are applied atomically. The remove names the index we
        // read, so a concurrent move makes the whole request fail.
        self.update_aliases(
            json!([
                { "remove": { "index": from, "alias": alias } },
                { "add": { "index": to, "alias": alias } }
            ]),
            "swap alias",
        )
        .await?;
        debug!(alias = %alias, from = %from, to = %to, "Alias swapped");
        Ok(())
    }
}
