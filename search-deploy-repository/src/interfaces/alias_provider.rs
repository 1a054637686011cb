//! Alias provider trait definition.

use async_trait::async_trait;

use crate::errors::SearchIndexError;

/// Abstracts reading and writing alias bindings on the search service.
#[async_trait]
pub trait AliasProvider: Send + Sync {
    /// Indices the alias points at, sorted by name.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - If the alias does not exist
    /// * `Ok(Some(indices))` - The alias' targets
    /// * `Err(SearchIndexError)` - If the lookup fails
    async fn get_alias(&self, alias: &str) -> Result<Option<Vec<String>>, SearchIndexError>;

    /// Add the alias to an index.
    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), SearchIndexError>;

    /// Move the alias from one index to another in a single atomic request.
    ///
    /// The request fails, and nothing changes, when the alias no longer
    /// points at `from`.
    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), SearchIndexError>;
}
