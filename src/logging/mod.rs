//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use toolpack::logging::init_logging;
//! use toolpack::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a job status transition
///
/// # Example
///
/// ```no_run
/// use toolpack::log_job_transition;
/// use toolpack::domain::{JobId, JobStatus};
///
/// let job_id = JobId::generate();
/// log_job_transition!(&job_id, JobStatus::InProgress);
/// log_job_transition!(&job_id, JobStatus::Failed, "Step 2/4 failed");
/// ```
#[macro_export]
macro_rules! log_job_transition {
    ($job_id:expr, $status:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            "Export job status changed"
        );
    };
    ($job_id:expr, $status:expr, $detail:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            detail = %$detail,
            "Export job status changed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use toolpack::log_error_with_context;
/// use toolpack::domain::ToolpackError;
///
/// let error = ToolpackError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}

/// Log a step retry
///
/// # Example
///
/// ```no_run
/// use toolpack::log_retry_attempt;
/// use std::time::Duration;
///
/// log_retry_attempt!("job-1", "build-package", 2, 3, Duration::from_secs(4), "disk full");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($job_id:expr, $step:expr, $attempt:expr, $max_attempts:expr, $delay:expr, $reason:expr) => {
        tracing::warn!(
            job_id = %$job_id,
            step = %$step,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay.as_millis() as u64,
            reason = %$reason,
            "Retrying export step"
        );
    };
}
