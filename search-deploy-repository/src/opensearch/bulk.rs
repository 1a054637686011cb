//! Bulk request bodies and bulk response parsing.

use opensearch::http::request::JsonBody;
use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use crate::types::{BulkImportResult, BulkItemResult};
use search_deploy_shared::Document;

/// The NDJSON lines of a bulk request: an `index` action followed by the
/// source, for each document in order.
pub fn bulk_lines(documents: &[Document]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(documents.len() * 2);
    for doc in documents {
        let action = match doc.id {
            Some(ref id) => json!({ "index": { "_id": id } }),
            None => json!({ "index": {} }),
        };
        lines.push(action);
        lines.push(doc.source());
    }
    lines
}

pub(super) fn build_bulk_body(documents: &[Document]) -> Vec<JsonBody<Value>> {
    bulk_lines(documents).into_iter().map(Into::into).collect()
}

/// Parse a bulk response into per-document outcomes.
///
/// Items are returned in request order; an item is a failure when it
/// carries an `error` or a non-2xx `status`.
pub fn parse_bulk_response(body: &Value) -> Result<BulkImportResult, SearchIndexError> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchIndexError::response_parse("bulk response has no 'items' array"))?;

    let results = items
        .iter()
        .map(|item| {
            // Each item is keyed by its action name ("index", "create", ...)
            let Some(outcome) = item.as_object().and_then(|o| o.values().next()) else {
                return Err(SearchIndexError::response_parse(format!(
                    "unexpected bulk item: {}",
                    item
                )));
            };

            let document_id = outcome
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string);

            if let Some(error) = outcome.get("error").filter(|e| !e.is_null()) {
                return Ok(BulkItemResult::failed(document_id, describe_error(error)));
            }

            match outcome.get("status").and_then(Value::as_u64) {
                Some(status) if !(200..300).contains(&status) => Ok(BulkItemResult::failed(
                    document_id,
                    format!("status {}", status),
                )),
                _ => Ok(BulkItemResult::succeeded(document_id)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BulkImportResult::from_results(results))
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        _ => match (error.get("type"), error.get("reason")) {
            (Some(Value::String(kind)), Some(Value::String(reason))) => {
                format!("{}: {}", kind, reason)
            }
            _ => error.to_string(),
        },
    }
}
