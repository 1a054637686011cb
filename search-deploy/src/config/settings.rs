//! Settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::AppError;
use search_deploy_pipeline::RiverConfig;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default alias searches are served through.
const DEFAULT_SEARCH_ALIAS: &str = "catalog";

/// Default schema mapping file.
const DEFAULT_SCHEMA_FILE: &str = "schema.json";

/// Default dataset files, imported in order.
const DEFAULT_DATASET_FILES: &str = "items.json,collections.json";

/// Default pause after deleting an index, in milliseconds.
const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Default number of documents per bulk request.
const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Tool settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub opensearch_url: String,
    pub alias: String,
    pub index_prefix: String,
    pub schema_file: PathBuf,
    pub dataset_files: Vec<PathBuf>,
    pub river: Option<RiverConfig>,
    pub settle_delay: Duration,
    /// `None` sends every file in a single bulk request.
    pub max_batch_size: Option<usize>,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SEARCH_ALIAS`: alias searches go through (default: catalog)
    /// - `INDEX_PREFIX`: prefix of generated index names (default: the alias)
    /// - `SCHEMA_FILE`: schema mapping file (default: schema.json)
    /// - `DATASET_FILES`: comma separated dataset files (default: items.json,collections.json)
    /// - `RIVER_TYPE` / `RIVER_SOURCE`: river plugin type and its JSON settings (default: no river)
    /// - `SETTLE_DELAY_MS`: pause after deleting an index (default: 500)
    /// - `MAX_BATCH_SIZE`: documents per bulk request, 0 for no limit (default: 1000)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let alias = var("SEARCH_ALIAS").unwrap_or_else(|| DEFAULT_SEARCH_ALIAS.to_string());
        let index_prefix = var("INDEX_PREFIX").unwrap_or_else(|| alias.clone());

        let dataset_files = var("DATASET_FILES")
            .unwrap_or_else(|| DEFAULT_DATASET_FILES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from)
            .collect();

        let river = match (var("RIVER_TYPE"), var("RIVER_SOURCE")) {
            (None, None) => None,
            (Some(river_type), source) => {
                let source = match source {
                    Some(raw) => parse_river_source(&raw)?,
                    None => Value::Object(Default::default()),
                };
                Some(RiverConfig::new(river_type, source))
            }
            (None, Some(_)) => {
                return Err(AppError::config("RIVER_SOURCE is set but RIVER_TYPE is not"));
            }
        };

        let settle_delay_ms = match var("SETTLE_DELAY_MS") {
            Some(raw) => parse_number::<u64>("SETTLE_DELAY_MS", &raw)?,
            None => DEFAULT_SETTLE_DELAY_MS,
        };

        let max_batch_size = match var("MAX_BATCH_SIZE") {
            Some(raw) => parse_number::<usize>("MAX_BATCH_SIZE", &raw)?,
            None => DEFAULT_MAX_BATCH_SIZE,
        };

        Ok(Self {
            opensearch_url: var("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            alias,
            index_prefix,
            schema_file: PathBuf::from(
                var("SCHEMA_FILE").unwrap_or_else(|| DEFAULT_SCHEMA_FILE.to_string()),
            ),
            dataset_files,
            river,
            settle_delay: Duration::from_millis(settle_delay_ms),
            max_batch_size: (max_batch_size > 0).then_some(max_batch_size),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

fn parse_river_source(raw: &str) -> Result<Value, AppError> {
    match serde_json::from_str(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(AppError::config("RIVER_SOURCE must be a JSON object")),
        Err(e) => Err(AppError::config(format!("RIVER_SOURCE is not valid JSON: {}", e))),
    }
}
