//! Export job execution
//!
//! This module provides the export engine of Toolpack, including:
//! - The orchestrator owning the job lifecycle
//! - Per-step timeout and retry
//! - Best-effort LIFO rollback
//! - In-process cancellation tokens

pub mod cancellation;
pub mod context;
pub mod executor;
pub mod orchestrator;
pub mod rollback;

pub use cancellation::{CancellationRegistry, CancellationToken};
pub use context::ExportContext;
pub use executor::{RetryPolicy, StepExecutor};
pub use orchestrator::{
    ExportOrchestrator, ExportOrchestratorBuilder, OrchestratorSettings, RecoveredJob,
};
pub use rollback::RollbackReport;
