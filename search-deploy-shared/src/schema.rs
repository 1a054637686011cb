//! Schema mapping configuration.
//!
//! The schema is a JSON object keyed by resource type. Each entry is the
//! field-definition structure for that resource, e.g.
//!
//! ```json
//! {
//!   "item":       { "properties": { "title": { "type": "text" } } },
//!   "collection": { "properties": { "name":  { "type": "keyword" } } }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::document::RESOURCE_TYPE_FIELD;

/// Errors that can occur while loading a schema mapping.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid schema: {0}")]
    Invalid(String),
}

/// Mapping from resource type to its field definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMapping {
    resources: BTreeMap<String, Value>,
}

impl SchemaMapping {
    /// Build a schema from resource mappings.
    pub fn new(resources: BTreeMap<String, Value>) -> Self {
        Self { resources }
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SchemaError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse a schema from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        let schema: SchemaMapping =
            serde_json::from_str(raw).map_err(|e| SchemaError::Invalid(e.to_string()))?;

        if let Some((resource, _)) = schema.resources.iter().find(|(_, m)| !m.is_object()) {
            return Err(SchemaError::Invalid(format!(
                "mapping for resource '{}' is not an object",
                resource
            )));
        }
        Ok(schema)
    }

    /// Resource types in the schema, in sorted order.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Iterate over `(resource type, mapping)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Copy of the schema with `_meta.created` set on every resource mapping.
    pub fn stamped(&self, created: &str) -> Self {
        let resources = self
            .resources
            .iter()
            .map(|(resource, mapping)| {
                let mut mapping = mapping.clone();
                if let Value::Object(ref mut fields) = mapping {
                    fields.insert("_meta".to_string(), json!({ "created": created }));
                }
                (resource.clone(), mapping)
            })
            .collect();
        Self { resources }
    }

    /// A single index mapping covering every resource type.
    ///
    /// Properties of all resources are merged (a later resource type wins on
    /// a name clash), the `resource_type` keyword field is added, and each
    /// resource's `_meta` is kept under `_meta.resources.<type>`.
    pub fn index_mappings(&self) -> Value {
        let mut properties = Map::new();
        for mapping in self.resources.values() {
            if let Some(Value::Object(props)) = mapping.get("properties") {
                for (field, definition) in props {
                    properties.insert(field.clone(), definition.clone());
                }
            }
        }

        properties.insert(RESOURCE_TYPE_FIELD.to_string(), json!({ "type": "keyword" }));

        json!({
            "_meta": { "resources": self.resource_metas() },
            "properties": properties
        })
    }

    /// Put-mapping body for one resource type.
    ///
    /// A put-mapping request replaces the index `_meta` as a whole, so the
    /// body carries the `_meta` of every resource, as `index_mappings` does.
    /// Returns `None` for an unknown resource type.
    pub fn resource_update(&self, resource_type: &str) -> Option<Value> {
        let mapping = self.resources.get(resource_type)?;
        let properties = mapping
            .get("properties")
            .cloned()
            .unwrap_or_else(|| json!({}));

        Some(json!({
            "_meta": { "resources": self.resource_metas() },
            "properties": properties
        }))
    }

    fn resource_metas(&self) -> Map<String, Value> {
        self.resources
            .iter()
            .filter_map(|(resource, mapping)| {
                mapping.get("_meta").map(|meta| (resource.clone(), meta.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaMapping {
        SchemaMapping::from_json_str(
            r#"{
                "item": { "properties": { "title": { "type": "text" } } },
                "collection": { "properties": { "name": { "type": "keyword" } } }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resource_types_sorted() {
        let schema = sample();
        let types: Vec<&str> = schema.resource_types().collect();
        assert_eq!(types, vec!["collection", "item"]);
    }

    #[test]
    fn test_stamped_sets_created_on_every_resource() {
        let stamped = sample().stamped("2024-03-07T09:05:01Z");

        for (_, mapping) in stamped.iter() {
            assert_eq!(mapping["_meta"]["created"], "2024-03-07T09:05:01Z");
        }
        // The unstamped schema is left as it was
        assert!(sample().iter().all(|(_, m)| m.get("_meta").is_none()));
    }

    #[test]
    fn test_index_mappings_merges_properties() {
        let mappings = sample().stamped("ts").index_mappings();

        assert_eq!(mappings["properties"]["title"]["type"], "text");
        assert_eq!(mappings["properties"]["name"]["type"], "keyword");
        assert_eq!(mappings["properties"][RESOURCE_TYPE_FIELD]["type"], "keyword");
        assert_eq!(mappings["_meta"]["resources"]["item"]["created"], "ts");
    }

    #[test]
    fn test_resource_update_keeps_every_resource_stamp() {
        let schema = sample().stamped("ts");

        let body = schema.resource_update("item").unwrap();

        assert_eq!(body["properties"]["title"]["type"], "text");
        assert!(body["properties"].get("name").is_none());
        assert_eq!(body["_meta"]["resources"]["item"]["created"], "ts");
        assert_eq!(body["_meta"]["resources"]["collection"]["created"], "ts");
        assert!(body["_meta"].get("created").is_none());
    }

    #[test]
    fn test_resource_update_unknown_type() {
        assert!(sample().resource_update("map").is_none());
    }

    #[test]
    fn test_rejects_non_object_mapping() {
        let result = SchemaMapping::from_json_str(r#"{ "item": 3 }"#);
        assert!(matches!(result, Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = SchemaMapping::from_json_str("{ not json");
        assert!(matches!(result, Err(SchemaError::Invalid(_))));
    }
}
