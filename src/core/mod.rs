//! Core business logic for Toolpack.
//!
//! # Modules
//!
//! - [`export`] - The orchestrator, step execution, rollback and cancellation
//! - [`strategy`] - Export steps, per-family strategies and type resolution
//! - [`preflight`] - Checks run before a job is created
//! - [`permission`] - The export permission hook
//!
//! # Export Workflow
//!
//! 1. **Pre-flight**: validate the tool and scratch space; errors block the export
//! 2. **Authorize**: ask the permission hook
//! 3. **Create**: store the job in `PENDING` and detach execution
//! 4. **Plan**: resolve the tool type, validate tool data, enumerate steps
//! 5. **Execute**: run steps in order under timeout and retry, recording progress
//! 6. **Finish**: mark `COMPLETED`, or roll back completed steps in reverse
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolpack::adapters::memory::{InMemoryExportJobRepository, InMemoryToolRegistry};
//! use toolpack::core::export::ExportOrchestrator;
//! use toolpack::domain::{ToolId, UserId};
//!
//! # async fn example() -> toolpack::domain::Result<()> {
//! let tools = Arc::new(InMemoryToolRegistry::from_json_file("tools.json").await?);
//! let jobs = Arc::new(InMemoryExportJobRepository::new());
//! let orchestrator = ExportOrchestrator::builder(tools, jobs).build();
//!
//! let job = orchestrator
//!     .start_export(&ToolId::new("contact-form"), &UserId::new("alice"))
//!     .await?;
//!
//! let status = orchestrator.get_export_status(&job.job_id).await?;
//! println!("{}: {}%", status.status, status.progress_percentage);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod permission;
pub mod preflight;
pub mod strategy;
