//! Export step contract
//!
//! A step is one rollback-capable unit of work. Steps are produced fresh per
//! job by a strategy and carry no persisted identity beyond their name, which
//! is recorded in the job's completed-steps ledger.

use crate::core::export::context::ExportContext;
use crate::domain::Result;
use async_trait::async_trait;

/// One unit of work within an export job
///
/// `execute` may be attempted several times when `retryable` is true, so it
/// should tolerate leftovers of an earlier failed attempt. `rollback` is only
/// called for steps whose `execute` succeeded and must undo exactly what that
/// execution produced.
#[async_trait]
pub trait ExportStep: Send + Sync {
    /// Stable step name (recorded in the completed-steps ledger)
    fn name(&self) -> &str;

    /// Human-readable description shown as the job's current step
    fn description(&self) -> &str;

    /// Whether a failed attempt may be retried
    fn retryable(&self) -> bool {
        false
    }

    /// Perform the step
    async fn execute(&self, ctx: &mut ExportContext) -> Result<()>;

    /// Undo the step's effects
    async fn rollback(&self, ctx: &mut ExportContext) -> Result<()>;
}

impl std::fmt::Debug for dyn ExportStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStep")
            .field("name", &self.name())
            .field("retryable", &self.retryable())
            .finish()
    }
}
