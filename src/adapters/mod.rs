//! Persistence integrations for Toolpack.
//!
//! This module provides the repositories the export orchestrator reads and
//! writes through:
//!
//! - [`database`] - Repository traits and the backend factory
//! - [`memory`] - In-process repositories (default target, used by tests)
//! - [`postgresql`] - PostgreSQL repositories
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The orchestrator only sees
//! the traits in [`database::traits`].
//!
//! ```rust
//! use toolpack::adapters::database::ToolRegistryRepository;
//! use toolpack::adapters::memory::InMemoryToolRegistry;
//! use toolpack::domain::{ToolId, ToolRecord};
//!
//! # #[tokio::main]
//! # async fn main() -> toolpack::domain::Result<()> {
//! let registry = InMemoryToolRegistry::with_tools([ToolRecord::new(
//!     "t-form",
//!     "Contact form",
//!     serde_json::json!({"toolType": "form"}),
//! )]);
//!
//! let tool = registry.find_by_id(&ToolId::new("t-form")).await?;
//! assert!(tool.is_some());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
