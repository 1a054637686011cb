//! Result types for bulk import operations.

/// Outcome of one document within a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    /// The document's identifier, when one was supplied or assigned.
    pub document_id: Option<String>,
    /// Whether the document was indexed.
    pub success: bool,
    /// Error description if the document failed.
    pub error: Option<String>,
}

impl BulkItemResult {
    /// A successfully indexed document.
    pub fn succeeded(document_id: Option<String>) -> Self {
        Self {
            document_id,
            success: true,
            error: None,
        }
    }

    /// A document the search service rejected.
    pub fn failed(document_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            document_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Per-document outcomes of a bulk import, in document order.
///
/// A bulk import attempts every document; individual failures are recorded
/// here rather than raised as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkImportResult {
    /// Total number of documents attempted.
    pub total: usize,
    /// Number of documents indexed.
    pub succeeded: usize,
    /// Number of documents rejected.
    pub failed: usize,
    /// Individual results for each document.
    pub results: Vec<BulkItemResult>,
}

impl BulkImportResult {
    /// Build a result from ordered per-document outcomes.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Concatenate results of consecutive bulk requests.
    pub fn concat(parts: impl IntoIterator<Item = BulkImportResult>) -> Self {
        Self::from_results(parts.into_iter().flat_map(|p| p.results).collect())
    }

    /// The documents that failed, in document order.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_results_counts() {
        let result = BulkImportResult::from_results(vec![
            BulkItemResult::succeeded(Some("1".into())),
            BulkItemResult::failed(Some("2".into()), "mapper_parsing_exception"),
            BulkItemResult::succeeded(Some("3".into())),
        ]);

        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert!(result.has_failures());

        let failed: Vec<_> = result.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].document_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_concat_keeps_order() {
        let first = BulkImportResult::from_results(vec![BulkItemResult::succeeded(Some("a".into()))]);
        let second = BulkImportResult::from_results(vec![
            BulkItemResult::failed(Some("b".into()), "boom"),
            BulkItemResult::succeeded(Some("c".into())),
        ]);

        let combined = BulkImportResult::concat([first, second]);
        let ids: Vec<_> = combined
            .results
            .iter()
            .map(|r| r.document_id.clone().unwrap())
            .collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(combined.total, 3);
        assert_eq!(combined.failed, 1);
    }

    #[test]
    fn test_empty_result() {
        let result = BulkImportResult::concat(Vec::new());
        assert_eq!(result, BulkImportResult::default());
        assert!(!result.has_failures());
    }
}
