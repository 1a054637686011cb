//! OpenSearch index creation bodies.

use serde_json::{json, Value};

use crate::config::IndexSettings;

/// Build the body of a create-index request from settings and mappings.
pub fn create_index_body(settings: &IndexSettings, mappings: &Value) -> Value {
    json!({
        "settings": {
            "number_of_shards": settings.number_of_shards,
            "number_of_replicas": settings.number_of_replicas
        },
        "mappings": mappings
    })
}
