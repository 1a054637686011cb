//! Importer for the search deploy pipeline.
//!
//! Loads dataset files and bulk imports their documents into an index.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::errors::DeployError;
use search_deploy_repository::{BulkImportResult, IndexClient};
use search_deploy_shared::{Document, INGEST_TYPE_FIELD};

/// Lines of a parser error kept in a `ParseError` message.
pub const PARSE_ERROR_MAX_LINES: usize = 25;

/// Parse a dataset: a JSON array of objects.
///
/// With `inject_type`, each document is tagged with the resource type named
/// by its `ingestType` field.
pub fn parse_documents(raw: &str, inject_type: bool) -> Result<Vec<Document>, DeployError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DeployError::parse(truncate_parse_message(&e.to_string())))?;

    let Value::Array(items) = value else {
        return Err(DeployError::parse("dataset must be a JSON array of documents"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let mut document = Document::from_json(item).ok_or_else(|| {
                DeployError::parse(format!("element {} of the dataset is not an object", position))
            })?;
            if inject_type {
                document.inject_type_from(INGEST_TYPE_FIELD);
            }
            Ok(document)
        })
        .collect()
}

/// Keep the first `PARSE_ERROR_MAX_LINES` lines of a parser message and
/// mark the cut.
pub fn truncate_parse_message(message: &str) -> String {
    let head: Vec<&str> = message.lines().take(PARSE_ERROR_MAX_LINES).collect();
    format!("JSON parse error: {} \n[SNIP]...", head.join("\n"))
}

/// Read and parse a dataset file.
pub async fn process_file(path: &Path, inject_type: bool) -> Result<Vec<Document>, DeployError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DeployError::io(format!("failed to read {}: {}", path.display(), e)))?;

    parse_documents(&raw, inject_type).map_err(|e| match e {
        DeployError::ParseError(msg) => {
            DeployError::parse(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// A document the search service refused.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub document_id: Option<String>,
    pub error: String,
}

/// Outcome of importing one dataset file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub index: String,
    pub file: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportSummary {
    /// Summarize a bulk result.
    pub fn from_result(index: &str, file: &Path, result: &BulkImportResult) -> Self {
        let failures = result
            .failures()
            .map(|item| ImportFailure {
                document_id: item.document_id.clone(),
                error: item.error.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            index: index.to_string(),
            file: file.to_path_buf(),
            total: result.total,
            succeeded: result.succeeded,
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Operator-facing lines: `Imported s/t docs OK` then one line per failure.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Imported {}/{} docs OK", self.succeeded, self.total)];
        lines.extend(self.failures.iter().map(|f| {
            format!("{}: {}", f.document_id.as_deref().unwrap_or("<no id>"), f.error)
        }));
        lines
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report_lines().join("\n"))
    }
}

/// Imports dataset files into an index.
pub struct Importer {
    client: Arc<IndexClient>,
    inject_type: bool,
}

impl Importer {
    pub fn new(client: Arc<IndexClient>, inject_type: bool) -> Self {
        Self { client, inject_type }
    }

    /// Import one file: load, bulk import, refresh.
    ///
    /// A file that fails to load sends nothing. Documents the service rejects
    /// are listed in the summary and do not fail the import.
    #[instrument(skip(self), fields(file = %path.display()))]
    pub async fn import_file(&self, index: &str, path: &Path) -> Result<ImportSummary, DeployError> {
        let documents = process_file(path, self.inject_type).await?;

        let result = self.client.bulk_import(index, &documents).await?;
        self.client.refresh(index).await?;

        let summary = ImportSummary::from_result(index, path, &result);
        if summary.has_failures() {
            warn!(
                index = %index,
                succeeded = summary.succeeded,
                total = summary.total,
                "Some documents were rejected"
            );
            for failure in &summary.failures {
                warn!(
                    document_id = failure.document_id.as_deref().unwrap_or("<no id>"),
                    error = %failure.error,
                    "Document rejected"
                );
            }
        } else {
            info!(index = %index, total = summary.total, "Imported documents");
        }

        Ok(summary)
    }

    /// Import files in order, stopping at the first file that fails.
    pub async fn import_dataset(
        &self,
        index: &str,
        files: &[PathBuf],
    ) -> Result<Vec<ImportSummary>, DeployError> {
        let mut summaries = Vec::with_capacity(files.len());
        for file in files {
            summaries.push(self.import_file(index, file).await?);
        }
        Ok(summaries)
    }
}
