//! Domain error types
//!
//! This module defines the error hierarchy for Toolpack. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Toolpack error type
///
/// This is the primary error type used throughout the library. Callers of
/// `start_export` see validation, authorization and not-found variants
/// synchronously; failures during execution are only visible on the job record.
#[derive(Debug, Error)]
pub enum ToolpackError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors (invalid tool data, bad input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pre-flight validation reported hard failures; no job was created
    #[error("Pre-flight validation failed: {}", .0.join("; "))]
    PreFlightFailed(Vec<String>),

    /// The permission hook denied the operation
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Tool record does not exist in the registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Export job does not exist
    #[error("Export job not found: {0}")]
    JobNotFound(String),

    /// Operation is not allowed in the job's current status
    #[error("Invalid job state: {0}")]
    InvalidState(String),

    /// Tool type could not be determined or has no registered strategy
    #[error("Unsupported tool type: {0}")]
    UnsupportedToolType(String),

    /// Step execution errors
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ToolpackError {
    /// Whether this error is raised before any job record exists
    ///
    /// These are the errors `start_export` surfaces synchronously.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ToolpackError::Validation(_)
                | ToolpackError::PreFlightFailed(_)
                | ToolpackError::Authorization(_)
                | ToolpackError::ToolNotFound(_)
        )
    }
}

/// Errors raised while running a single export step
#[derive(Debug, Error)]
pub enum StepError {
    /// The step's own execution failed
    #[error("step '{step}' failed: {message}")]
    Failed { step: String, message: String },

    /// The step did not finish within its deadline
    #[error("step '{step}' timed out after {timeout:?}")]
    Timeout {
        step: String,
        timeout: std::time::Duration,
    },
}

impl StepError {
    /// Creates a failure for the named step
    pub fn failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        StepError::Failed {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Name of the step this error belongs to
    pub fn step(&self) -> &str {
        match self {
            StepError::Failed { step, .. } | StepError::Timeout { step, .. } => step,
        }
    }

    /// Whether the error was produced by the per-attempt deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, StepError::Timeout { .. })
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ToolpackError {
    fn from(err: std::io::Error) -> Self {
        ToolpackError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ToolpackError {
    fn from(err: serde_json::Error) -> Self {
        ToolpackError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ToolpackError {
    fn from(err: toml::de::Error) -> Self {
        ToolpackError::Configuration(format!("TOML parse error: {err}"))
    }
}
