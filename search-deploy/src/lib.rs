//! # Search Deploy
//!
//! Main library for the search deployment tool.
//!
//! This crate provides the configuration and wiring used by the
//! `search-deploy` binary to run the deployment pipeline.

pub mod config;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during tool initialization or execution.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Deployment error.
    #[error("Deployment error: {0}")]
    DeployError(#[from] search_deploy_pipeline::DeployError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_deploy_repository::SearchIndexError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
