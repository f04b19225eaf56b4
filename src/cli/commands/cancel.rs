//! Cancel command implementation
//!
//! Moves a job to `CANCELLING`. The process executing the job notices at its
//! next step boundary and rolls back.

use super::{connect, exit_code_for, load_validated};
use crate::domain::{JobId, UserId};
use clap::Args;

/// Arguments for the cancel command
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Job to cancel
    #[arg(long)]
    pub job_id: JobId,

    /// User requesting the cancellation (must own the job)
    #[arg(long, env = "TOOLPACK_USER_ID")]
    pub user_id: String,
}

impl CancelArgs {
    /// Execute the cancel command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(job_id = %self.job_id, "Requesting export cancellation");

        let config = match load_validated(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let orchestrator = match connect(&config, None).await {
            Ok(o) => o,
            Err(code) => return Ok(code),
        };

        let user_id = UserId::new(self.user_id.clone());
        match orchestrator.cancel_export(&self.job_id, &user_id).await {
            Ok(()) => {
                println!("🛑 Cancellation requested for export job {}", self.job_id);
                Ok(0)
            }
            Err(e) => {
                println!("❌ Cannot cancel export job {}", self.job_id);
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
