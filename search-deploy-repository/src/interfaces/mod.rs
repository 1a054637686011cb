//! Interface definitions for the search service.
//!
//! The provider traits allow dependency injection and swappable backends:
//! the OpenSearch implementation in production, an in-memory engine in tests.

mod alias_provider;
mod index_provider;
mod river_provider;

pub use alias_provider::AliasProvider;
pub use index_provider::IndexProvider;
pub use river_provider::RiverProvider;
