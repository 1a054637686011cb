//! # Search Deploy Pipeline
//!
//! This crate provides the components that rebuild and deploy versioned
//! search indices behind a stable alias.
//!
//! ## Architecture
//!
//! The pipeline is a fixed sequence driven by the orchestrator:
//!
//! 1. **Importer**: Loads dataset files and bulk imports them into an index
//! 2. **River Manager**: Creates and removes secondary ingestion rivers
//! 3. **Alias Resolver**: Reads and moves the alias, one target at a time
//! 4. **Orchestrator**: Sequences index creation, import, alias swap and river cleanup

pub mod alias;
pub mod errors;
pub mod importer;
pub mod orchestrator;
pub mod river;

pub use alias::AliasResolver;
pub use errors::DeployError;
pub use importer::{ImportFailure, ImportSummary, Importer};
pub use orchestrator::{
    DeployReport, IndexListing, Orchestrator, OrchestratorConfig, RecreateReport,
    SchemaUpdateOutcome,
};
pub use river::{RiverConfig, RiverManager};
