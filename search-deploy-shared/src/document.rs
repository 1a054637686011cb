//! Dataset document model.

use serde_json::{Map, Value};

/// Field of a dataset record naming the resource type it belongs to.
pub const INGEST_TYPE_FIELD: &str = "ingestType";

/// Keyword field the resource type is stored under in the indexed source.
///
/// OpenSearch has no mapping types, so the resource type travels with the
/// document instead of in the bulk action metadata.
pub const RESOURCE_TYPE_FIELD: &str = "resource_type";

/// A single record read from a dataset file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document identifier, taken from `_id` or `id`. `None` lets the search
    /// service assign one.
    pub id: Option<String>,
    /// Resource type the document is tagged with, if any.
    pub resource_type: Option<String>,
    /// The document body, without the `_id` metadata field.
    pub body: Map<String, Value>,
}

impl Document {
    /// Build a document from a JSON value.
    ///
    /// Returns `None` when the value is not a JSON object.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut body) = value else {
            return None;
        };

        // `_id` is a metadata field and must not be sent as part of the source
        let id = body
            .remove("_id")
            .and_then(|v| id_string(&v))
            .or_else(|| body.get("id").and_then(id_string));

        Some(Self {
            id,
            resource_type: None,
            body,
        })
    }

    /// Set the resource type from a field of the document body.
    ///
    /// A missing or non-string field clears the resource type.
    pub fn inject_type_from(&mut self, field: &str) {
        self.resource_type = self
            .body
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    /// The source sent to the search service.
    pub fn source(&self) -> Value {
        let mut source = self.body.clone();
        if let Some(ref resource_type) = self.resource_type {
            source.insert(
                RESOURCE_TYPE_FIELD.to_string(),
                Value::String(resource_type.clone()),
            );
        }
        Value::Object(source)
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_prefers_metadata_id() {
        let doc = Document::from_json(json!({"_id": "abc", "id": "other", "title": "x"})).unwrap();

        assert_eq!(doc.id, Some("abc".to_string()));
        assert!(!doc.body.contains_key("_id"));
        assert_eq!(doc.body["id"], "other");
    }

    #[test]
    fn test_from_json_numeric_id() {
        let doc = Document::from_json(json!({"id": 42})).unwrap();
        assert_eq!(doc.id, Some("42".to_string()));
    }

    #[test]
    fn test_from_json_without_id() {
        let doc = Document::from_json(json!({"title": "untitled"})).unwrap();
        assert!(doc.id.is_none());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Document::from_json(json!(["a", "b"])).is_none());
        assert!(Document::from_json(json!("a")).is_none());
    }

    #[test]
    fn test_inject_type() {
        let mut doc = Document::from_json(json!({"id": "1", "ingestType": "item"})).unwrap();
        doc.inject_type_from(INGEST_TYPE_FIELD);

        assert_eq!(doc.resource_type, Some("item".to_string()));
        assert_eq!(doc.source()[RESOURCE_TYPE_FIELD], "item");
    }

    #[test]
    fn test_inject_type_missing_field() {
        let mut doc = Document::from_json(json!({"id": "1"})).unwrap();
        doc.inject_type_from(INGEST_TYPE_FIELD);

        assert!(doc.resource_type.is_none());
        assert!(doc.source().get(RESOURCE_TYPE_FIELD).is_none());
    }
}
