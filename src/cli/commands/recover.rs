//! Recover command implementation
//!
//! Reconciles export jobs that a crashed or killed process left in
//! `PENDING`, `IN_PROGRESS` or `CANCELLING`.

use super::{connect, exit_code_for, load_validated};
use clap::Args;

/// Arguments for the recover command
#[derive(Args, Debug)]
pub struct RecoverArgs {}

impl RecoverArgs {
    /// Execute the recover command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Recovering orphaned export jobs");

        let config = match load_validated(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let orchestrator = match connect(&config, None).await {
            Ok(o) => o,
            Err(code) => return Ok(code),
        };

        let recovered = match orchestrator.recover_orphaned_jobs().await {
            Ok(recovered) => recovered,
            Err(e) => {
                println!("❌ Recovery failed");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if recovered.is_empty() {
            println!("✅ No orphaned export jobs found");
            return Ok(0);
        }

        println!("♻️  Recovered {} export job(s):", recovered.len());
        for job in &recovered {
            println!(
                "  - {}: {} -> {} ({} step(s) rolled back)",
                job.job_id,
                job.previous_status,
                job.final_status,
                job.rolled_back_steps.len()
            );
        }
        Ok(0)
    }
}
