//! Alias resolver for the search deploy pipeline.
//!
//! Reads the index an alias points at and moves the alias to a new index.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::DeployError;
use search_deploy_repository::AliasProvider;

/// Resolves and repoints a search alias.
///
/// An alias is expected to have at most one target. When it has several the
/// resolver refuses to pick one and reports an integrity error instead.
pub struct AliasResolver {
    provider: Arc<dyn AliasProvider>,
}

impl AliasResolver {
    /// Create a new alias resolver with the given provider.
    pub fn new(provider: Arc<dyn AliasProvider>) -> Self {
        Self { provider }
    }

    /// The index an alias currently points at, or `None` when it is unbound.
    pub async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, DeployError> {
        match self.provider.get_alias(alias).await? {
            None => Ok(None),
            Some(targets) => single_target(alias, targets).map(Some),
        }
    }

    /// Every index an alias points at, sorted. Unlike `resolve_alias` this
    /// does not reject an alias with several targets.
    pub async fn targets(&self, alias: &str) -> Result<Vec<String>, DeployError> {
        Ok(self.provider.get_alias(alias).await?.unwrap_or_default())
    }

    /// Point an alias at `new_index`, returning the index it pointed at before.
    ///
    /// An unbound alias is created and `None` is returned. An alias with more
    /// than one target is left untouched. After any change the alias is read
    /// back and must point at `new_index` only.
    #[instrument(skip(self))]
    pub async fn point_alias_at(
        &self,
        alias: &str,
        new_index: &str,
    ) -> Result<Option<String>, DeployError> {
        let previous = match self.provider.get_alias(alias).await? {
            None => {
                self.provider.create_alias(alias, new_index).await?;
                info!(alias = %alias, index = %new_index, "Created alias");
                None
            }
            Some(targets) => {
                let previous = single_target(alias, targets)?;
                if previous == new_index {
                    info!(alias = %alias, index = %new_index, "Alias already points at index");
                    return Ok(Some(previous));
                }

                self.provider.swap_alias(alias, &previous, new_index).await?;
                info!(alias = %alias, from = %previous, to = %new_index, "Swapped alias");
                Some(previous)
            }
        };

        self.verify_binding(alias, new_index).await?;
        Ok(previous)
    }

    async fn verify_binding(&self, alias: &str, expected: &str) -> Result<(), DeployError> {
        let targets = self.provider.get_alias(alias).await?.unwrap_or_default();
        if targets.len() == 1 && targets[0] == expected {
            return Ok(());
        }

        warn!(alias = %alias, expected = %expected, targets = ?targets, "Alias changed concurrently");
        Err(DeployError::integrity(format!(
            "alias '{}' should point at '{}' only but points at [{}]",
            alias,
            expected,
            targets.join(", ")
        )))
    }
}

fn single_target(alias: &str, mut targets: Vec<String>) -> Result<String, DeployError> {
    if targets.len() == 1 {
        if let Some(target) = targets.pop() {
            return Ok(target);
        }
    }
    Err(DeployError::integrity(format!(
        "alias '{}' points at {} indices [{}]; fix the alias by hand",
        alias,
        targets.len(),
        targets.join(", ")
    )))
}
