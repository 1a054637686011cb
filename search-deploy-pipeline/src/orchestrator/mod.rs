//! Orchestrator module for the search deploy pipeline.
//!
//! Sequences the index client, alias resolver, river manager and importer
//! into the recreate and deploy workflows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::alias::AliasResolver;
use crate::errors::DeployError;
use crate::importer::{ImportSummary, Importer};
use crate::river::{RiverConfig, RiverManager};
use search_deploy_repository::{
    AliasProvider, DiagnosticResult, EndpointConfig, IndexClient, IndexProvider, RiverProvider,
    SearchIndexConfig, SearchIndexError,
};
use search_deploy_shared::{generate_index_name, validate_index_name, SchemaMapping};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Endpoint the deployment is meant for.
    pub endpoint: EndpointConfig,
    /// Alias searches are served through.
    pub alias: String,
    /// Prefix of generated index names.
    pub index_prefix: String,
    /// Dataset files, imported in order.
    pub dataset: Vec<PathBuf>,
    /// Resource mappings applied to new indices.
    pub schema: SchemaMapping,
    /// Pause between deleting an index and recreating it.
    pub settle_delay: Duration,
    /// Tag documents with the resource type named by `ingestType`.
    pub inject_type: bool,
    /// River source. `None` disables rivers.
    pub river: Option<RiverConfig>,
    /// Index client settings.
    pub index_client: SearchIndexConfig,
}

impl OrchestratorConfig {
    /// Configuration for `alias` on `endpoint`; generated names use the alias
    /// as their prefix.
    pub fn new(endpoint: EndpointConfig, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            endpoint,
            index_prefix: alias.clone(),
            alias,
            dataset: Vec::new(),
            schema: SchemaMapping::default(),
            settle_delay: Duration::from_millis(500),
            inject_type: true,
            river: None,
            index_client: SearchIndexConfig::default(),
        }
    }

    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    pub fn with_dataset(mut self, files: Vec<PathBuf>) -> Self {
        self.dataset = files;
        self
    }

    pub fn with_schema(mut self, schema: SchemaMapping) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_inject_type(mut self, inject_type: bool) -> Self {
        self.inject_type = inject_type;
        self
    }

    pub fn with_river(mut self, river: RiverConfig) -> Self {
        self.river = Some(river);
        self
    }

    pub fn with_index_client(mut self, config: SearchIndexConfig) -> Self {
        self.index_client = config;
        self
    }
}

/// Result of recreating the environment.
#[derive(Debug)]
pub struct RecreateReport {
    /// The recreated index.
    pub index: String,
    /// One summary per dataset file.
    pub imports: Vec<ImportSummary>,
    /// Documents visible through the alias afterwards.
    pub document_count: DiagnosticResult<u64>,
}

/// Result of deploying an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// The index the alias now points at.
    pub index: String,
    /// The index the alias pointed at before, if any.
    pub previous_index: Option<String>,
    /// The previous index when it differs from the deployed one. It is left
    /// in place for the operator to delete.
    pub orphaned: Option<String>,
}

/// One index and whether the alias points at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexListing {
    pub name: String,
    pub deployed: bool,
}

/// Outcome of applying one resource mapping.
#[derive(Debug)]
pub struct SchemaUpdateOutcome {
    pub resource_type: String,
    pub result: Result<(), SearchIndexError>,
}

/// Orchestrator that coordinates the deployment components.
///
/// Steps run one after another. A failing step stops the workflow and
/// nothing already done is rolled back.
pub struct Orchestrator {
    config: OrchestratorConfig,
    client: Arc<IndexClient>,
    aliases: AliasResolver,
    rivers: RiverManager,
    importer: Importer,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        config: OrchestratorConfig,
        client: Arc<IndexClient>,
        aliases: AliasResolver,
        rivers: RiverManager,
        importer: Importer,
    ) -> Self {
        Self {
            config,
            client,
            aliases,
            rivers,
            importer,
        }
    }

    /// Build every component on top of one search service handle.
    pub fn from_engine<E>(engine: Arc<E>, config: OrchestratorConfig) -> Self
    where
        E: IndexProvider + AliasProvider + RiverProvider + 'static,
    {
        let client = Arc::new(IndexClient::with_config(
            engine.clone(),
            config.index_client.clone(),
        ));
        let aliases = AliasResolver::new(engine.clone());
        let rivers = RiverManager::new(engine, config.alias.clone(), config.river.clone());
        let importer = Importer::new(client.clone(), config.inject_type);

        Self::new(config, client, aliases, rivers, importer)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Check that the client talks to the configured endpoint and that the
    /// service answers there.
    pub async fn endpoint_config_check(&self) -> Result<(), DeployError> {
        let expected = self.config.endpoint.as_str().trim_end_matches('/');
        let actual = self.client.endpoint().trim_end_matches('/');
        if expected != actual {
            return Err(DeployError::configuration(format!(
                "client is connected to '{}' but the deployment is configured for '{}'",
                actual, expected
            )));
        }

        self.client.ping().await.map_err(|e| {
            DeployError::configuration(format!("search service at '{}' is unreachable: {}", actual, e))
        })
    }

    fn index_mappings(&self) -> serde_json::Value {
        self.stamped_schema().index_mappings()
    }

    fn stamped_schema(&self) -> SchemaMapping {
        self.config.schema.stamped(&Utc::now().to_rfc3339())
    }

    /// Tear down and rebuild the index behind the alias from the dataset.
    ///
    /// The index the alias points at is recreated under the same name; when
    /// the alias is unbound a new dated index is created.
    #[instrument(skip(self), fields(alias = %self.config.alias))]
    pub async fn recreate_environment(&self) -> Result<RecreateReport, DeployError> {
        self.endpoint_config_check().await?;

        let alias = &self.config.alias;
        let index = match self.aliases.resolve_alias(alias).await? {
            Some(index) => index,
            None => generate_index_name(&self.config.index_prefix, Utc::now()),
        };

        // The river would keep writing into the index while it is rebuilt
        self.rivers.delete_default_river().await?;

        if self.client.index_exists(&index).await? {
            self.client.delete_index(&index).await?;
            tokio::time::sleep(self.config.settle_delay).await;
        }

        self.client.create_index(&index, &self.index_mappings()).await?;
        let imports = self.importer.import_dataset(&index, &self.config.dataset).await?;

        // Deleting the index dropped the alias with it
        self.aliases.point_alias_at(alias, &index).await?;
        self.rivers.create_default_river().await?;

        let document_count = self.client.document_count(alias).await;
        match document_count {
            Ok(count) => info!(index = %index, count, "Recreated environment"),
            Err(ref e) => warn!(index = %index, error = %e, "Recreated environment"),
        }

        Ok(RecreateReport {
            index,
            imports,
            document_count,
        })
    }

    /// Point the alias at `target` and move the default river over.
    ///
    /// The index the alias pointed at before is reported, never deleted.
    #[instrument(skip(self), fields(alias = %self.config.alias))]
    pub async fn deploy_index(&self, target: &str) -> Result<DeployReport, DeployError> {
        validate_index_name(target).map_err(|e| DeployError::configuration(e.to_string()))?;
        if target == self.config.alias {
            return Err(DeployError::configuration(format!(
                "'{}' is the alias itself; deploy a concrete index",
                target
            )));
        }
        self.endpoint_config_check().await?;

        if !self.client.index_exists(target).await? {
            return Err(DeployError::integrity(format!(
                "index '{}' does not exist",
                target
            )));
        }

        match self.client.document_count(target).await {
            Ok(0) => warn!(index = %target, "Deploying an empty index"),
            Ok(_) => {}
            Err(e) => warn!(index = %target, error = %e, "Deploying an index of unknown size"),
        }

        // A river created alongside the target index writes straight into
        // it; after the swap the default river feeds it through the alias.
        self.rivers.delete_river(target).await?;
        self.rivers.delete_default_river().await?;

        let alias = &self.config.alias;
        let previous_index = self.aliases.point_alias_at(alias, target).await?;
        self.rivers.create_default_river().await?;

        let orphaned = previous_index.clone().filter(|previous| previous != target);
        if let Some(ref orphan) = orphaned {
            info!(index = %orphan, "Previous index is no longer deployed and can be deleted");
        }
        info!(alias = %alias, index = %target, "Deployed index");

        Ok(DeployReport {
            index: target.to_string(),
            previous_index,
            orphaned,
        })
    }

    /// Create a dated index with the configured schema.
    #[instrument(skip(self))]
    pub async fn create_index(&self) -> Result<String, DeployError> {
        self.endpoint_config_check().await?;

        let name = generate_index_name(&self.config.index_prefix, Utc::now());
        Ok(self.client.create_index(&name, &self.index_mappings()).await?)
    }

    /// Create a dated index and a river of the same name feeding it.
    pub async fn create_index_with_river(&self) -> Result<String, DeployError> {
        let name = self.create_index().await?;
        self.rivers.create_river(&name, &name).await?;
        Ok(name)
    }

    /// Import the configured dataset into an existing index.
    #[instrument(skip(self))]
    pub async fn import_into(&self, index: &str) -> Result<Vec<ImportSummary>, DeployError> {
        validate_index_name(index).map_err(|e| DeployError::configuration(e.to_string()))?;
        self.endpoint_config_check().await?;

        if !self.client.index_exists(index).await? {
            return Err(DeployError::integrity(format!("index '{}' does not exist", index)));
        }
        self.importer.import_dataset(index, &self.config.dataset).await
    }

    /// Apply each resource mapping to the deployed index.
    ///
    /// Every resource is attempted; the outcome of each is returned.
    #[instrument(skip(self))]
    pub async fn update_schema(&self) -> Result<Vec<SchemaUpdateOutcome>, DeployError> {
        self.endpoint_config_check().await?;

        let index = self.deployed_index().await?;
        let schema = self.stamped_schema();
        let mut outcomes = Vec::new();
        for resource_type in schema.resource_types() {
            let Some(body) = schema.resource_update(resource_type) else {
                continue;
            };
            let result = self.client.apply_mapping(&index, resource_type, &body).await;
            outcomes.push(SchemaUpdateOutcome {
                resource_type: resource_type.to_string(),
                result,
            });
        }
        Ok(outcomes)
    }

    /// Every index, with the one the alias points at flagged.
    pub async fn list_indices(&self) -> Result<Vec<IndexListing>, DeployError> {
        self.endpoint_config_check().await?;

        let deployed = self.aliases.targets(&self.config.alias).await?;
        let indices = self.client.list_indices().await?;

        Ok(indices
            .into_iter()
            .map(|name| IndexListing {
                deployed: deployed.contains(&name),
                name,
            })
            .collect())
    }

    /// Delete an index and the river named after it.
    ///
    /// The index the alias points at cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete_index(&self, name: &str) -> Result<(), DeployError> {
        validate_index_name(name).map_err(|e| DeployError::configuration(e.to_string()))?;
        self.endpoint_config_check().await?;

        let deployed = self.aliases.targets(&self.config.alias).await?;
        if deployed.iter().any(|target| target == name) {
            return Err(DeployError::integrity(format!(
                "index '{}' is deployed behind alias '{}'",
                name, self.config.alias
            )));
        }

        self.rivers.delete_river(name).await?;
        self.client.delete_index(name).await?;
        Ok(())
    }

    /// Delete and recreate the default river.
    pub async fn recreate_river(&self) -> Result<bool, DeployError> {
        self.endpoint_config_check().await?;
        self.rivers.recreate_river().await
    }

    /// Documents visible through the alias.
    pub async fn document_count(&self) -> DiagnosticResult<u64> {
        self.client.document_count(&self.config.alias).await
    }

    /// Raw status of the search service.
    pub async fn service_status(&self) -> DiagnosticResult<String> {
        self.client.service_status().await
    }

    /// Raw mapping of the index behind the alias.
    pub async fn search_schema(&self) -> DiagnosticResult<String> {
        self.client.index_mapping(&self.config.alias).await
    }

    async fn deployed_index(&self) -> Result<String, DeployError> {
        self.aliases
            .resolve_alias(&self.config.alias)
            .await?
            .ok_or_else(|| {
                DeployError::integrity(format!(
                    "alias '{}' does not point at any index",
                    self.config.alias
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_search_engine::{InMemorySearchEngine, Operation};
    use serde_json::json;

    const ENDPOINT: &str = "http://localhost:9200";

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new(EndpointConfig::parse(ENDPOINT).unwrap(), "catalog")
            .with_settle_delay(Duration::ZERO)
            .with_river(RiverConfig::new("jdbc", json!({ "url": "jdbc:postgresql://db/catalog" })))
    }

    fn orchestrator(engine: &Arc<InMemorySearchEngine>) -> Orchestrator {
        Orchestrator::from_engine(engine.clone(), config())
    }

    #[tokio::test]
    async fn test_endpoint_check_accepts_trailing_slash() {
        let engine = Arc::new(InMemorySearchEngine::new("http://localhost:9200/"));
        orchestrator(&engine).endpoint_config_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_endpoint_check_rejects_unreachable_service() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT).unreachable());

        let err = orchestrator(&engine).endpoint_config_check().await.unwrap_err();
        assert!(matches!(err, DeployError::ConfigurationError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recreate_waits_for_settle_delay() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_alias("catalog", &["catalog-1"]),
        );
        let orchestrator = Orchestrator::from_engine(
            engine.clone(),
            config().with_settle_delay(Duration::from_millis(500)),
        );

        let started = tokio::time::Instant::now();
        orchestrator.recreate_environment().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_recreate_reuses_aliased_index_name() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_documents("catalog-1", &[json!({ "stale": true })])
                .with_alias("catalog", &["catalog-1"]),
        );

        let report = orchestrator(&engine).recreate_environment().await.unwrap();

        assert_eq!(report.index, "catalog-1");
        assert!(engine.documents("catalog-1").is_empty());
        assert_eq!(engine.alias_targets("catalog"), Some(vec!["catalog-1".to_string()]));
        assert_eq!(report.document_count.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recreate_unbound_alias_generates_index() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));

        let report = orchestrator(&engine).recreate_environment().await.unwrap();

        assert!(report.index.starts_with("catalog-"));
        assert!(engine.has_index(&report.index));
        assert_eq!(engine.alias_targets("catalog"), Some(vec![report.index.clone()]));
        assert!(engine.river("catalog").is_some());
    }

    #[tokio::test]
    async fn test_create_index_applies_stamped_schema() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));
        let schema = SchemaMapping::from_json_str(
            r#"{ "item": { "properties": { "title": { "type": "text" } } } }"#,
        )
        .unwrap();
        let orchestrator = Orchestrator::from_engine(engine.clone(), config().with_schema(schema));

        let name = orchestrator.create_index().await.unwrap();

        let mapping = engine.mapping(&name).unwrap();
        assert_eq!(mapping["properties"]["title"]["type"], "text");
        assert_eq!(mapping["properties"]["resource_type"]["type"], "keyword");
        assert!(mapping["_meta"]["resources"]["item"]["created"].is_string());
    }

    #[tokio::test]
    async fn test_create_index_with_river_names_river_after_index() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));

        let name = orchestrator(&engine).create_index_with_river().await.unwrap();

        let meta = engine.river(&name).unwrap();
        assert_eq!(meta["index"]["index"], name.as_str());
    }

    #[tokio::test]
    async fn test_deploy_removes_target_river() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_documents("catalog-2", &[json!({})])
                .with_river("catalog-2", json!({ "type": "jdbc" })),
        );

        orchestrator(&engine).deploy_index("catalog-2").await.unwrap();

        assert_eq!(engine.rivers(), vec!["catalog".to_string()]);
    }

    #[tokio::test]
    async fn test_deploy_empty_index_still_deploys() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT).with_index("catalog-2"));

        let report = orchestrator(&engine).deploy_index("catalog-2").await.unwrap();

        assert_eq!(report.previous_index, None);
        assert_eq!(engine.alias_targets("catalog"), Some(vec!["catalog-2".to_string()]));
    }

    #[tokio::test]
    async fn test_deploy_alias_name_is_configuration_error() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_alias("catalog", &["catalog-1"]),
        );

        let err = orchestrator(&engine).deploy_index("catalog").await.unwrap_err();

        assert!(matches!(err, DeployError::ConfigurationError(_)));
        assert!(engine.operations().is_empty());
    }

    #[tokio::test]
    async fn test_list_indices_checks_endpoint() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT).unreachable());

        let err = orchestrator(&engine).list_indices().await.unwrap_err();
        assert!(matches!(err, DeployError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_deploy_invalid_name_is_configuration_error() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));

        let err = orchestrator(&engine).deploy_index("Catalog").await.unwrap_err();
        assert!(matches!(err, DeployError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_update_schema_continues_after_failure() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_alias("catalog", &["catalog-1"])
                .reject_mapping_field("name"),
        );
        let schema = SchemaMapping::from_json_str(
            r#"{
                "collection": { "properties": { "name": { "type": "keyword" } } },
                "item": { "properties": { "title": { "type": "text" } } }
            }"#,
        )
        .unwrap();
        let orchestrator = Orchestrator::from_engine(engine.clone(), config().with_schema(schema));

        let outcomes = orchestrator.update_schema().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].resource_type, "collection");
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].resource_type, "item");
        assert!(outcomes[1].result.is_ok());
        assert_eq!(
            engine.mapping("catalog-1").unwrap()["properties"]["title"]["type"],
            "text"
        );
    }

    #[tokio::test]
    async fn test_update_schema_keeps_resource_stamps() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));
        let schema = SchemaMapping::from_json_str(
            r#"{
                "collection": { "properties": { "name": { "type": "keyword" } } },
                "item": { "properties": { "title": { "type": "text" } } }
            }"#,
        )
        .unwrap();
        let orchestrator = Orchestrator::from_engine(engine.clone(), config().with_schema(schema));

        let report = orchestrator.recreate_environment().await.unwrap();
        orchestrator.update_schema().await.unwrap();

        let meta = &engine.mapping(&report.index).unwrap()["_meta"];
        assert!(meta["resources"]["collection"]["created"].is_string());
        assert!(meta["resources"]["item"]["created"].is_string());
        assert!(meta.get("created").is_none());
    }

    #[tokio::test]
    async fn test_update_schema_requires_bound_alias() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT));

        let err = orchestrator(&engine).update_schema().await.unwrap_err();
        assert!(matches!(err, DeployError::IntegrityError(_)));
    }

    #[tokio::test]
    async fn test_list_indices_flags_deployed() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_index("catalog-2")
                .with_alias("catalog", &["catalog-2"])
                .with_river("catalog", json!({})),
        );

        let listing = orchestrator(&engine).list_indices().await.unwrap();

        assert_eq!(
            listing,
            vec![
                IndexListing { name: "catalog-1".to_string(), deployed: false },
                IndexListing { name: "catalog-2".to_string(), deployed: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_index_refuses_deployed_index() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_alias("catalog", &["catalog-1"]),
        );

        let err = orchestrator(&engine).delete_index("catalog-1").await.unwrap_err();

        assert!(matches!(err, DeployError::IntegrityError(_)));
        assert!(engine.has_index("catalog-1"));
    }

    #[tokio::test]
    async fn test_delete_index_removes_its_river() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_river("catalog-1", json!({})),
        );

        orchestrator(&engine).delete_index("catalog-1").await.unwrap();

        assert!(!engine.has_index("catalog-1"));
        assert!(engine.rivers().is_empty());
        assert_eq!(
            engine.operations(),
            vec![
                Operation::DeleteRiver("catalog-1".to_string()),
                Operation::DeleteIndex("catalog-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_diagnostic_reads_degrade() {
        let engine = Arc::new(InMemorySearchEngine::new(ENDPOINT).unreachable());
        let orchestrator = orchestrator(&engine);

        let count = orchestrator.document_count().await.unwrap_err();
        assert_eq!(count.operation, "document count");
        assert!(orchestrator.service_status().await.is_err());
        assert!(orchestrator.search_schema().await.is_err());
    }

    #[tokio::test]
    async fn test_search_schema_reads_aliased_index() {
        let engine = Arc::new(
            InMemorySearchEngine::new(ENDPOINT)
                .with_index("catalog-1")
                .with_alias("catalog", &["catalog-1"]),
        );

        let schema = orchestrator(&engine).search_schema().await.unwrap();
        assert!(schema.contains("catalog-1"));
    }
}
