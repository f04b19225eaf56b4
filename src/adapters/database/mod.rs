//! Repository abstraction layer
//!
//! Trait seams for the tool registry and export job storage, plus the
//! factory that picks a backend (in-memory or PostgreSQL) from configuration.

pub mod factory;
pub mod traits;

pub use factory::{create_repositories, Repositories};
pub use traits::{ExportJobRepository, ToolRegistryRepository};
