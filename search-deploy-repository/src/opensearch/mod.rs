//! OpenSearch implementation of the provider interfaces.
//!
//! This module provides `OpenSearchProvider`, which implements
//! `IndexProvider`, `AliasProvider` and `RiverProvider` against an
//! OpenSearch-compatible HTTP API.

mod alias;
mod bulk;
mod client;
mod index_config;
mod river;

pub use bulk::{bulk_lines, parse_bulk_response};
pub use client::OpenSearchProvider;
pub use index_config::create_index_body;
pub use river::{river_delete_path, river_meta_path};
