//! River operations for the OpenSearch provider.
//!
//! Rivers have no typed endpoints in the client, so requests are sent raw.

use async_trait::async_trait;
use opensearch::http::{headers::HeaderMap, request::JsonBody, Method};
use serde_json::Value;
use tracing::debug;

use super::client::{ensure_success, transport_error, OpenSearchProvider};
use crate::errors::SearchIndexError;
use crate::interfaces::RiverProvider;

/// Path of a river's `_meta` document.
pub fn river_meta_path(name: &str) -> String {
    format!("/_river/{}/_meta", name)
}

/// Path used to delete a river.
pub fn river_delete_path(name: &str) -> String {
    format!("/_river/{}", name)
}

#[async_trait]
impl RiverProvider for OpenSearchProvider {
    async fn put_river(&self, name: &str, meta: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .send(
                Method::Put,
                &river_meta_path(name),
                HeaderMap::new(),
                None::<&()>,
                Some(JsonBody::new(meta.clone())),
                None,
            )
            .await
            .map_err(|e| transport_error("put river", e))?;

        ensure_success(response, "put river").await?;
        debug!(river = %name, "River created");
        Ok(())
    }

    async fn delete_river(&self, name: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .send(
                Method::Delete,
                &river_delete_path(name),
                HeaderMap::new(),
                None::<&()>,
                None::<JsonBody<Value>>,
                None,
            )
            .await
            .map_err(|e| transport_error("delete river", e))?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        ensure_success(response, "delete river").await?;
        debug!(river = %name, "River deleted");
        Ok(true)
    }
}
