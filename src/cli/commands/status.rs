//! Status command implementation
//!
//! This module implements the `status` command for displaying one export
//! job in detail or the most recent jobs as a table.

use super::{connect, exit_code_for, load_validated};
use crate::config::DatabaseTarget;
use crate::domain::{ExportJob, JobId};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single job
    #[arg(long)]
    pub job_id: Option<JobId>,

    /// Number of recent jobs to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_validated(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let orchestrator = match connect(&config, None).await {
            Ok(o) => o,
            Err(code) => return Ok(code),
        };

        println!("📊 Export Status");
        println!();

        if let Some(job_id) = &self.job_id {
            return match orchestrator.get_export_status(job_id).await {
                Ok(job) => {
                    print_job(&job);
                    Ok(0)
                }
                Err(e) => {
                    println!("❌ {e}");
                    Ok(exit_code_for(&e))
                }
            };
        }

        let jobs = match orchestrator.list_exports(self.limit).await {
            Ok(jobs) => jobs,
            Err(e) => {
                println!("❌ Failed to list export jobs");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if jobs.is_empty() {
            println!("No export jobs found.");
            if config.database_target == DatabaseTarget::Memory {
                println!("In-memory storage only holds jobs started by this process.");
            }
            return Ok(0);
        }

        println!("Found {} job(s):", jobs.len());
        println!();
        println!(
            "{:<38} {:<20} {:<12} {:>5} {:>7} {:<20}",
            "Job ID", "Tool ID", "Status", "%", "Steps", "Created"
        );
        println!("{}", "-".repeat(106));

        for job in &jobs {
            println!(
                "{:<38} {:<20} {:<12} {:>5} {:>7} {:<20}",
                job.job_id.to_string(),
                job.tool_id.as_str(),
                job.status.as_str(),
                job.progress_percentage,
                format!("{}/{}", job.steps_completed, job.steps_total),
                job.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
            );
        }

        println!();
        Ok(0)
    }
}

fn print_job(job: &ExportJob) {
    println!("  Job: {}", job.job_id);
    println!("  Tool: {}", job.tool_id);
    println!("  User: {}", job.user_id);
    println!("  Status: {}", job.status);
    println!(
        "  Progress: {}% ({}/{} steps)",
        job.progress_percentage, job.steps_completed, job.steps_total
    );
    if let Some(step) = &job.current_step {
        println!("  Current step: {step}");
    }
    if !job.completed_steps.is_empty() {
        println!("  Completed steps: {}", job.completed_steps.join(", "));
    }
    if let Some(error) = &job.error_message {
        println!("  Error: {error}");
    }
    if let Some(path) = &job.package_path {
        println!("  Package: {path}");
    }
    println!("  Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(completed_at) = job.completed_at {
        println!("  Finished: {}", completed_at.format("%Y-%m-%d %H:%M:%S"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            job_id: None,
            limit: 20,
        };

        assert!(args.job_id.is_none());
        assert_eq!(args.limit, 20);
    }
}
