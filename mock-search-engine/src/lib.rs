//! In-memory search service for testing.
//!
//! This crate provides `InMemorySearchEngine`, a single source of truth for
//! index, alias and river state that implements every provider interface of
//! `search-deploy-repository`. Tests wire it into the deployment pipeline in
//! place of OpenSearch:
//!
//! ```text
//! Orchestrator → IndexClient / AliasResolver / RiverManager → OpenSearchProvider → OpenSearch
//! Orchestrator → IndexClient / AliasResolver / RiverManager → InMemorySearchEngine
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use mock_search_engine::InMemorySearchEngine;
//!
//! let engine = Arc::new(
//!     InMemorySearchEngine::new("http://localhost:9200/")
//!         .with_index("catalog-20240307-090501")
//!         .with_alias("catalog", &["catalog-20240307-090501"])
//!         .reject_document("bad-doc"),
//! );
//!
//! assert_eq!(
//!     engine.alias_targets("catalog"),
//!     Some(vec!["catalog-20240307-090501".to_string()])
//! );
//! ```
//!
//! Every mutating call is appended to an operation log (`operations()`), so
//! tests can assert on the exact order of a deployment.

mod engine;

pub use engine::{FailPoint, InMemorySearchEngine, Operation};
