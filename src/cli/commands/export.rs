//! Export command implementation
//!
//! This module implements the `export` command: start an export job for a
//! tool and follow it until the job and its rollback have finished.

use super::{
    connect, exit_code_for, load_validated, progress_line, EXIT_INTERRUPTED, EXIT_UNSUCCESSFUL,
};
use crate::config::DatabaseTarget;
use crate::core::export::ExportOrchestrator;
use crate::domain::{ExportJob, JobId, JobStatus, ToolId, ToolpackError, UserId};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Tool to export
    #[arg(long)]
    pub tool_id: String,

    /// User requesting the export
    #[arg(long, env = "TOOLPACK_USER_ID")]
    pub user_id: String,

    /// Print the job id and return without following the job
    #[arg(long)]
    pub detach: bool,

    /// Polling interval while following the job
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(tool_id = %self.tool_id, user_id = %self.user_id, "Starting export command");

        let config = match load_validated(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let orchestrator = match connect(&config, Some(shutdown_signal.clone())).await {
            Ok(o) => o,
            Err(code) => return Ok(code),
        };

        if config.export.recover_on_startup {
            match orchestrator.recover_orphaned_jobs().await {
                Ok(recovered) if !recovered.is_empty() => {
                    println!("♻️  Recovered {} interrupted export job(s)", recovered.len());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Startup recovery failed"),
            }
        }

        let tool_id = ToolId::new(self.tool_id.clone());
        let user_id = UserId::new(self.user_id.clone());

        let job = match orchestrator.start_export(&tool_id, &user_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, tool_id = %tool_id, "Export rejected");
                eprintln!("❌ Export rejected: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🚀 Export job {} started for tool '{}'", job.job_id, tool_id);

        if self.detach {
            if config.database_target == DatabaseTarget::Memory {
                println!("⚠️  In-memory storage: the job does not outlive this process");
            }
            return Ok(0);
        }

        let poll_interval = Duration::from_millis(self.poll_interval_ms.max(10));
        let mut last_line = String::new();
        let mut signal_open = true;

        loop {
            let current = orchestrator.get_export_status(&job.job_id).await?;
            let line = progress_line(&current);
            if line != last_line {
                println!("{line}");
                last_line = line;
            }

            if is_finished(&orchestrator, &current) {
                return Ok(print_summary(&current));
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                changed = shutdown_signal.changed(), if signal_open => match changed {
                    Ok(()) if *shutdown_signal.borrow() => {
                        let timeout_secs = config.export.shutdown_timeout_secs;
                        return self
                            .interrupt(&orchestrator, job.job_id, &user_id, timeout_secs)
                            .await;
                    }
                    Ok(()) => {}
                    Err(_) => signal_open = false,
                },
            }
        }
    }

    /// Request cancellation and wait for the rollback to settle
    async fn interrupt(
        &self,
        orchestrator: &ExportOrchestrator,
        job_id: JobId,
        user_id: &UserId,
        shutdown_timeout_secs: u64,
    ) -> anyhow::Result<i32> {
        println!();
        println!("⚠️  Shutdown signal received, cancelling export job {job_id}...");

        match orchestrator.cancel_export(&job_id, user_id).await {
            Ok(()) => {}
            Err(ToolpackError::InvalidState(reason)) => {
                tracing::debug!(job_id = %job_id, reason = %reason, "Job no longer cancellable");
            }
            Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Cancel request failed"),
        }

        let wait = async {
            loop {
                match orchestrator.get_export_status(&job_id).await {
                    Ok(job) if is_finished(orchestrator, &job) => return Some(job),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(job_id = %job_id, error = %e, "Failed to read job status");
                        return None;
                    }
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };

        match tokio::time::timeout(Duration::from_secs(shutdown_timeout_secs), wait).await {
            Ok(Some(job)) => {
                println!("{}", progress_line(&job));
                println!("   Export job ended as {}", job.status);
            }
            Ok(None) => {}
            Err(_) => {
                tracing::warn!(
                    job_id = %job_id,
                    timeout_secs = shutdown_timeout_secs,
                    "Shutdown timeout exceeded before rollback finished"
                );
                println!("   Rollback still running; run 'toolpack recover' to finish it.");
            }
        }

        Ok(EXIT_INTERRUPTED)
    }
}

/// Terminal status written and the execution (including rollback) is gone
fn is_finished(orchestrator: &ExportOrchestrator, job: &ExportJob) -> bool {
    job.is_terminal() && !orchestrator.active_jobs().contains(&job.job_id)
}

fn print_summary(job: &ExportJob) -> i32 {
    println!();
    println!("📊 Export Summary:");
    println!("  Job: {}", job.job_id);
    println!("  Status: {}", job.status);
    println!("  Steps: {}/{}", job.steps_completed, job.steps_total);
    if let Some(duration) = job.duration() {
        println!(
            "  Duration: {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }
    if let Some(path) = &job.package_path {
        println!("  Package: {path}");
    }
    if let Some(size) = job.package_size_bytes {
        println!("  Package size: {size} bytes");
    }
    if let Some(error) = &job.error_message {
        println!("  Error: {error}");
    }
    println!();

    if job.status == JobStatus::Completed {
        println!("✅ Export completed successfully!");
        0
    } else {
        println!("⚠️  Export ended as {}", job.status);
        EXIT_UNSUCCESSFUL
    }
}
