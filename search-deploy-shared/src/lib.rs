//! # Search Deploy Shared
//!
//! Types shared by every crate taking part in index deployment: the dataset
//! document model, the schema mapping, and index naming rules.

pub mod document;
pub mod index_name;
pub mod schema;

pub use document::{Document, INGEST_TYPE_FIELD, RESOURCE_TYPE_FIELD};
pub use index_name::{generate_index_name, validate_index_name, IndexNameError};
pub use schema::{SchemaError, SchemaMapping};
