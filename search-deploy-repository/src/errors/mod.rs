//! Error types for the search deploy repository.

mod diagnostic_error;
mod search_index_error;

pub use diagnostic_error::{DiagnosticReadError, DiagnosticResult};
pub use search_index_error::SearchIndexError;
