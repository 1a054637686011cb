//! Dependency initialization and wiring for the search deploy tool.

use std::sync::Arc;
use tracing::info;

use super::Settings;
use crate::AppError;
use search_deploy_pipeline::{Orchestrator, OrchestratorConfig};
use search_deploy_repository::{EndpointConfig, OpenSearchProvider, SearchIndexConfig};
use search_deploy_shared::SchemaMapping;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Build the OpenSearch provider and the orchestrator from settings.
    ///
    /// The schema file is only read when `load_schema` is set; commands that
    /// never create or update mappings run without one.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the endpoint or schema is invalid
    pub fn new(settings: &Settings, load_schema: bool) -> Result<Self, AppError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            alias = %settings.alias,
            index_prefix = %settings.index_prefix,
            river = settings.river.is_some(),
            "Initializing dependencies"
        );

        let endpoint = EndpointConfig::parse(&settings.opensearch_url)?;

        let schema = if load_schema {
            let schema = SchemaMapping::from_file(&settings.schema_file)
                .map_err(|e| AppError::config(e.to_string()))?;
            info!(
                schema_file = %settings.schema_file.display(),
                resources = ?schema.resource_types().collect::<Vec<_>>(),
                "Loaded schema"
            );
            schema
        } else {
            SchemaMapping::default()
        };

        let provider = OpenSearchProvider::new(&endpoint).map_err(|e| {
            AppError::config(format!("Failed to create OpenSearch client: {}", e))
        })?;

        let mut config = OrchestratorConfig::new(endpoint, settings.alias.clone())
            .with_index_prefix(settings.index_prefix.clone())
            .with_dataset(settings.dataset_files.clone())
            .with_schema(schema)
            .with_settle_delay(settings.settle_delay)
            .with_index_client(SearchIndexConfig {
                max_batch_size: settings.max_batch_size,
                ..Default::default()
            });
        if let Some(ref river) = settings.river {
            config = config.with_river(river.clone());
        }

        let orchestrator = Orchestrator::from_engine(Arc::new(provider), config);

        Ok(Self { orchestrator })
    }
}
