//! CLI command implementations
//!
//! This module contains all CLI command implementations plus the setup they
//! share: loading configuration, wiring the orchestrator and mapping errors
//! onto process exit codes.

pub mod cancel;
pub mod export;
pub mod init;
pub mod recover;
pub mod status;
pub mod validate;

use crate::adapters::database::create_repositories;
use crate::config::{load_config, ToolpackConfig};
use crate::core::export::{ExportOrchestrator, OrchestratorSettings};
use crate::domain::{ExportJob, ToolpackError};
use tokio::sync::watch;

/// Export ended in a status other than `COMPLETED`
pub const EXIT_UNSUCCESSFUL: i32 = 1;
/// Configuration could not be loaded or is invalid
pub const EXIT_CONFIGURATION: i32 = 2;
/// Request rejected (validation, authorization, unknown ids, job state)
pub const EXIT_REJECTED: i32 = 3;
/// Storage backend unreachable
pub const EXIT_CONNECTION: i32 = 4;
/// Anything else
pub const EXIT_FATAL: i32 = 5;
/// Interrupted by SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit code for a library error
pub fn exit_code_for(error: &ToolpackError) -> i32 {
    match error {
        ToolpackError::Configuration(_) => EXIT_CONFIGURATION,
        ToolpackError::Validation(_)
        | ToolpackError::PreFlightFailed(_)
        | ToolpackError::Authorization(_)
        | ToolpackError::ToolNotFound(_)
        | ToolpackError::JobNotFound(_)
        | ToolpackError::InvalidState(_)
        | ToolpackError::UnsupportedToolType(_) => EXIT_REJECTED,
        ToolpackError::Database(_) => EXIT_CONNECTION,
        _ => EXIT_FATAL,
    }
}

/// Load and validate the configuration, printing failures
///
/// Returns the exit code to use when the configuration is unusable.
pub(crate) fn load_validated(config_path: &str) -> Result<ToolpackConfig, i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, config_path = %config_path, "Failed to load configuration");
            eprintln!("❌ Failed to load configuration file: {e}");
            return Err(EXIT_CONFIGURATION);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("❌ Configuration validation failed: {e}");
        return Err(EXIT_CONFIGURATION);
    }

    Ok(config)
}

/// Build an orchestrator over the configured repositories
pub(crate) async fn connect(
    config: &ToolpackConfig,
    shutdown_signal: Option<watch::Receiver<bool>>,
) -> Result<ExportOrchestrator, i32> {
    let (tools, jobs) = match create_repositories(config).await {
        Ok(repositories) => repositories,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create repositories");
            eprintln!("❌ Failed to initialize storage: {e}");
            return Err(match e {
                ToolpackError::Configuration(_) => EXIT_CONFIGURATION,
                _ => EXIT_CONNECTION,
            });
        }
    };

    let mut builder = ExportOrchestrator::builder(tools, jobs)
        .settings(OrchestratorSettings::from_config(&config.export));
    if let Some(shutdown) = shutdown_signal {
        builder = builder.shutdown_signal(shutdown);
    }
    Ok(builder.build())
}

/// One-line progress rendering of a job
pub(crate) fn progress_line(job: &ExportJob) -> String {
    format!(
        "[{:>3}%] {} ({}/{}) {}",
        job.progress_percentage,
        job.status,
        job.steps_completed,
        job.steps_total,
        job.current_step.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, StepError, ToolId, UserId};
    use test_case::test_case;

    #[test_case(ToolpackError::Configuration("x".into()) => EXIT_CONFIGURATION)]
    #[test_case(ToolpackError::PreFlightFailed(vec!["x".into()]) => EXIT_REJECTED)]
    #[test_case(ToolpackError::Authorization("x".into()) => EXIT_REJECTED)]
    #[test_case(ToolpackError::ToolNotFound("x".into()) => EXIT_REJECTED)]
    #[test_case(ToolpackError::Database("x".into()) => EXIT_CONNECTION)]
    #[test_case(ToolpackError::Step(StepError::failed("s", "x")) => EXIT_FATAL)]
    fn test_exit_code_for(error: ToolpackError) -> i32 {
        exit_code_for(&error)
    }

    #[test]
    fn test_progress_line() {
        let mut job = ExportJob::new(JobId::generate(), ToolId::new("t"), UserId::new("u"));
        job.steps_total = 4;
        job.steps_completed = 1;
        job.progress_percentage = 25;
        job.current_step = Some("Writing manifest".to_string());

        assert_eq!(progress_line(&job), "[ 25%] PENDING (1/4) Writing manifest");
    }

    #[test]
    fn test_load_validated_missing_file() {
        assert_eq!(
            load_validated("/nonexistent/toolpack.toml").unwrap_err(),
            EXIT_CONFIGURATION
        );
    }
}
