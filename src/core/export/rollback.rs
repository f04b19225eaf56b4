//! Best-effort LIFO rollback
//!
//! Completed steps are undone last-completed first. A failing rollback is
//! logged and recorded in the [`RollbackReport`]; it never stops the
//! remaining steps from being rolled back.

use crate::adapters::database::traits::ExportJobRepository;
use crate::core::export::context::ExportContext;
use crate::core::strategy::ExportStep;
use crate::domain::{JobStatus, JobUpdate, Result};
use crate::{log_error_with_context, log_job_transition};
use std::io::ErrorKind;
use std::path::Path;

/// Description recorded once rollback finished
pub const ROLLED_BACK_DESCRIPTION: &str = "Rolled back successfully";

/// Current step text of a rolled back job, keeping the failure that caused it
///
/// `error_message` is cleared on `ROLLED_BACK`, so the reason moves here.
pub fn rolled_back_description(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Rolled back after: {reason}"),
        None => ROLLED_BACK_DESCRIPTION.to_string(),
    }
}

/// Outcome of one rollback pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Steps whose rollback was invoked, in invocation order
    pub attempted: Vec<String>,

    /// Steps whose rollback failed, with the error
    pub failures: Vec<(String, String)>,

    /// Whether the working directory is gone afterwards
    pub working_dir_removed: bool,
}

impl RollbackReport {
    /// True when every step rolled back without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Roll back `completed` (given in completion order) in reverse
pub async fn rollback_steps(
    completed: &[Box<dyn ExportStep>],
    ctx: &mut ExportContext,
) -> RollbackReport {
    let mut report = RollbackReport::default();

    for step in completed.iter().rev() {
        report.attempted.push(step.name().to_string());
        match step.rollback(ctx).await {
            Ok(()) => {
                tracing::debug!(job_id = %ctx.job_id, step = step.name(), "Step rolled back");
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %ctx.job_id,
                    step = step.name(),
                    error = %e,
                    "Step rollback failed, continuing"
                );
                report.failures.push((step.name().to_string(), e.to_string()));
            }
        }
    }

    report.working_dir_removed = remove_working_dir(&ctx.working_dir).await;
    report
}

/// Recursively remove a job's working directory, logging failures
pub async fn remove_working_dir(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(
                working_dir = %dir.display(),
                error = %e,
                "Failed to remove working directory"
            );
            false
        }
    }
}

/// Roll back a job and record the final `ROLLED_BACK` status
///
/// With no completed steps only the working directory is removed and the
/// job keeps its current status. Otherwise the error message is cleared and
/// `reason` (the failure that triggered rollback, if any) is carried in the
/// current step description.
///
/// # Errors
///
/// Returns an error only when the final status update fails.
pub async fn roll_back_job(
    jobs: &dyn ExportJobRepository,
    completed: &[Box<dyn ExportStep>],
    ctx: &mut ExportContext,
    reason: Option<&str>,
) -> Result<RollbackReport> {
    if completed.is_empty() {
        let working_dir_removed = remove_working_dir(&ctx.working_dir).await;
        return Ok(RollbackReport {
            working_dir_removed,
            ..RollbackReport::default()
        });
    }

    let in_progress = JobUpdate::new().current_step(format!(
        "Rolling back {} completed step(s)",
        completed.len()
    ));
    if let Err(e) = jobs.update(&ctx.job_id, in_progress).await {
        log_error_with_context!(e, "Failed to record rollback start");
    }

    let report = rollback_steps(completed, ctx).await;

    jobs.update(
        &ctx.job_id,
        JobUpdate::new()
            .status(JobStatus::RolledBack)
            .current_step(rolled_back_description(reason))
            .clear_error()
            .completed_now(),
    )
    .await?;

    log_job_transition!(
        ctx.job_id,
        JobStatus::RolledBack,
        format!(
            "{} step(s) rolled back, {} failed",
            report.attempted.len(),
            report.failures.len()
        )
    );
    Ok(report)
}
