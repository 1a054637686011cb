//! # Search Deploy Repository
//!
//! This crate provides traits and implementations for talking to the search
//! service during index deployment. It includes definitions for errors, the
//! provider interfaces for indices, aliases and rivers, a concrete
//! implementation for OpenSearch, and the `IndexClient` used by the
//! deployment pipeline.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use client::IndexClient;
pub use config::{EndpointConfig, IndexSettings, SearchIndexConfig};
pub use errors::{DiagnosticReadError, DiagnosticResult, SearchIndexError};
pub use interfaces::{AliasProvider, IndexProvider, RiverProvider};
pub use crate::opensearch::OpenSearchProvider;
pub use types::{BulkImportResult, BulkItemResult};
