//! River manager for the search deploy pipeline.
//!
//! Rivers are server-side ingestion jobs that keep feeding an index from a
//! secondary source after the initial import.

use std::sync::Arc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use crate::errors::DeployError;
use search_deploy_repository::RiverProvider;

/// Source settings for the rivers this deployment creates.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverConfig {
    /// River plugin type, e.g. `jdbc`.
    pub river_type: String,
    /// Plugin-specific settings placed under the river type key.
    pub source: Value,
}

impl RiverConfig {
    /// Create a river configuration.
    pub fn new(river_type: impl Into<String>, source: Value) -> Self {
        Self {
            river_type: river_type.into(),
            source,
        }
    }

    /// The `_meta` document of a river feeding `target`.
    pub fn meta(&self, target: &str) -> Value {
        let mut meta = Map::new();
        meta.insert("type".to_string(), Value::String(self.river_type.clone()));
        meta.insert(self.river_type.clone(), self.source.clone());
        meta.insert("index".to_string(), json!({ "index": target }));
        Value::Object(meta)
    }
}

/// Creates and deletes rivers.
///
/// The default river is named after the alias and feeds the alias. Without a
/// river configuration every operation is a no-op.
pub struct RiverManager {
    provider: Arc<dyn RiverProvider>,
    alias: String,
    config: Option<RiverConfig>,
}

impl RiverManager {
    /// Create a river manager for `alias`.
    pub fn new(
        provider: Arc<dyn RiverProvider>,
        alias: impl Into<String>,
        config: Option<RiverConfig>,
    ) -> Self {
        Self {
            provider,
            alias: alias.into(),
            config,
        }
    }

    /// Name of the default river.
    pub fn default_river_name(&self) -> &str {
        &self.alias
    }

    /// Whether rivers are configured.
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Create a river named `name` that feeds `target`.
    ///
    /// Returns `false` when rivers are not configured.
    #[instrument(skip(self))]
    pub async fn create_river(&self, target: &str, name: &str) -> Result<bool, DeployError> {
        let Some(ref config) = self.config else {
            debug!(river = %name, "No river configured, skipping create");
            return Ok(false);
        };

        self.provider.put_river(name, &config.meta(target)).await?;
        info!(river = %name, target = %target, "Created river");
        Ok(true)
    }

    /// Create the default river, feeding the alias.
    pub async fn create_default_river(&self) -> Result<bool, DeployError> {
        self.create_river(&self.alias, &self.alias).await
    }

    /// Delete a river. Deleting a river that does not exist succeeds.
    ///
    /// Returns whether a river was removed.
    #[instrument(skip(self))]
    pub async fn delete_river(&self, name: &str) -> Result<bool, DeployError> {
        if self.config.is_none() {
            debug!(river = %name, "No river configured, skipping delete");
            return Ok(false);
        }

        let removed = self.provider.delete_river(name).await?;
        if removed {
            info!(river = %name, "Deleted river");
        } else {
            debug!(river = %name, "River did not exist");
        }
        Ok(removed)
    }

    /// Delete the default river.
    pub async fn delete_default_river(&self) -> Result<bool, DeployError> {
        self.delete_river(&self.alias).await
    }

    /// Delete and recreate the default river.
    pub async fn recreate_river(&self) -> Result<bool, DeployError> {
        self.delete_default_river().await?;
        self.create_default_river().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_search_engine::{FailPoint, InMemorySearchEngine, Operation};

    const ENDPOINT: &str = "http://localhost:9200/";

    fn jdbc() -> RiverConfig {
        RiverConfig::new("jdbc", json!({ "url": "jdbc:postgresql://db/catalog" }))
    }

    #[test]
    fn test_meta_body() {
        let meta = jdbc().meta("catalog");

        assert_eq!(meta["type"], "jdbc");
        assert_eq!(meta["jdbc"]["url"], "jdbc:postgresql://db/catalog");
        assert_eq!(meta["index"]["index"], "catalog");
    }

    #[tokio::test]
    async fn test_default_river_targets_alias() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));
        let manager = RiverManager::new(engine.clone(), "catalog", Some(jdbc()));

        assert!(manager.create_default_river().await.unwrap());

        let meta = engine.river("catalog").unwrap();
        assert_eq!(meta["index"]["index"], "catalog");
    }

    #[tokio::test]
    async fn test_delete_missing_river_succeeds() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));
        let manager = RiverManager::new(engine.clone(), "catalog", Some(jdbc()));

        assert!(!manager.delete_river("catalog").await.unwrap());
        assert!(!manager.delete_river("catalog").await.unwrap());
        assert!(engine.operations().is_empty());
    }

    #[tokio::test]
    async fn test_recreate_replaces_river() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT).with_river("catalog", json!({ "type": "old" })),
        );
        let manager = RiverManager::new(engine.clone(), "catalog", Some(jdbc()));

        manager.recreate_river().await.unwrap();

        assert_eq!(engine.river("catalog").unwrap()["type"], "jdbc");
        assert_eq!(
            engine.operations(),
            vec![
                Operation::DeleteRiver("catalog".to_string()),
                Operation::PutRiver("catalog".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_disabled_manager_is_noop() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));
        let manager = RiverManager::new(engine.clone(), "catalog", None);

        assert!(!manager.is_enabled());
        assert!(!manager.create_default_river().await.unwrap());
        assert!(!manager.delete_default_river().await.unwrap());
        assert!(engine.rivers().is_empty());
    }

    #[tokio::test]
    async fn test_put_failure_propagates() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT).fail_on(FailPoint::PutRiver));
        let manager = RiverManager::new(engine, "catalog", Some(jdbc()));

        let err = manager.create_default_river().await.unwrap_err();
        assert!(matches!(err, DeployError::RemoteOperationError(_)));
    }
}
