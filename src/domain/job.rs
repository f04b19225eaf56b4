//! Export job record and lifecycle state
//!
//! An [`ExportJob`] is the durable record of one attempt to package a tool.
//! It is created in `PENDING` by the orchestrator and afterwards only written
//! by that job's execution routine (plus the `CANCELLING` request).

use crate::domain::ids::{JobId, ToolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Export job lifecycle status
///
/// ```text
/// PENDING -> IN_PROGRESS -> COMPLETED
///                        -> FAILED    --(rollback)--> ROLLED_BACK
///                        -> CANCELLING -> CANCELLED / ROLLED_BACK
/// ```
///
/// `FAILED` and `CANCELLED` are terminal only when no step had completed;
/// otherwise rollback overwrites them with `ROLLED_BACK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job row exists, execution not started yet
    Pending,
    /// Steps are running
    InProgress,
    /// Cancellation requested, waiting for the next step boundary
    Cancelling,
    /// Cancelled before any step completed
    Cancelled,
    /// All steps succeeded
    Completed,
    /// Fatal failure
    Failed,
    /// Completed steps were undone after a failure or cancellation
    RolledBack,
}

impl JobStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Cancelling,
        JobStatus::Cancelled,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::RolledBack,
    ];

    /// Statuses a job can be in while it still has (or should have) a live execution
    pub const UNFINISHED: [JobStatus; 3] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Cancelling,
    ];

    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Cancelling => "CANCELLING",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::RolledBack => "ROLLED_BACK",
        }
    }

    /// Whether the status ends the job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Completed | JobStatus::Failed | JobStatus::RolledBack
        )
    }

    /// Whether `cancel_export` may be requested in this status
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::InProgress)
    }

    /// Whether a cancellation has been requested or honored
    pub fn is_cancel_requested(&self) -> bool {
        matches!(self, JobStatus::Cancelling | JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown job status '{s}'"))
    }
}

/// Progress derived from step counters: `floor(100 * completed / total)`, 0 when total is 0
pub fn progress_percentage(steps_completed: u32, steps_total: u32) -> u8 {
    if steps_total == 0 {
        return 0;
    }
    let completed = u64::from(steps_completed.min(steps_total));
    (completed * 100 / u64::from(steps_total)) as u8
}

/// Durable export job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Job identifier
    pub job_id: JobId,

    /// Tool being exported
    pub tool_id: ToolId,

    /// User who started the export
    pub user_id: UserId,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Number of steps returned by the strategy (0 until enumerated)
    pub steps_total: u32,

    /// Number of steps that finished successfully
    pub steps_completed: u32,

    /// Derived progress, 0-100
    pub progress_percentage: u8,

    /// Human-readable description of the step in flight
    pub current_step: Option<String>,

    /// Failure description
    pub error_message: Option<String>,

    /// Location of the produced package (COMPLETED only)
    pub package_path: Option<String>,

    /// Size of the produced package in bytes (COMPLETED only)
    pub package_size_bytes: Option<u64>,

    /// Names of completed steps, in completion order
    #[serde(default)]
    pub completed_steps: Vec<String>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job record was last written
    pub updated_at: DateTime<Utc>,

    /// When the job reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    /// Creates a fresh `PENDING` job record
    pub fn new(job_id: JobId, tool_id: ToolId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            tool_id,
            user_id,
            status: JobStatus::Pending,
            steps_total: 0,
            steps_completed: 0,
            progress_percentage: 0,
            current_step: None,
            error_message: None,
            package_path: None,
            package_size_bytes: None,
            completed_steps: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether the job is in a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `user_id` initiated this job
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Time from creation to terminal transition, if finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }

    /// Applies a partial update
    ///
    /// Returns `false` without touching the record when the update carries a
    /// status guard that the current status does not satisfy. Fields not set
    /// in the update are left unchanged.
    pub fn apply(&mut self, update: &JobUpdate) -> bool {
        if let Some(expected) = &update.expected_status {
            if !expected.contains(&self.status) {
                return false;
            }
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(total) = update.steps_total {
            self.steps_total = total;
        }
        if let Some(completed) = update.steps_completed {
            self.steps_completed = completed;
        }
        if let Some(progress) = update.progress_percentage {
            self.progress_percentage = progress;
        }
        if let Some(current) = &update.current_step {
            self.current_step = Some(current.clone());
        }
        if let Some(error) = &update.error_message {
            self.error_message = error.clone();
        }
        if let Some(path) = &update.package_path {
            self.package_path = path.clone();
        }
        if let Some(size) = update.package_size_bytes {
            self.package_size_bytes = size;
        }
        if let Some(step) = &update.append_completed_step {
            self.completed_steps.push(step.clone());
        }
        if let Some(at) = update.completed_at {
            self.completed_at = Some(at);
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Fields supplied when creating a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExportJob {
    /// Tool being exported
    pub tool_id: ToolId,
    /// Initiating user
    pub user_id: UserId,
}

impl NewExportJob {
    /// Creates the field set for a new job
    pub fn new(tool_id: ToolId, user_id: UserId) -> Self {
        Self { tool_id, user_id }
    }

    /// Materializes the record under the given id
    pub fn into_job(self, job_id: JobId) -> ExportJob {
        ExportJob::new(job_id, self.tool_id, self.user_id)
    }
}

/// Partial update of an export job
///
/// Every field is optional; unset fields are never written. Nullable columns
/// use `Option<Option<_>>` so they can be cleared explicitly.
///
/// # Examples
///
/// ```
/// use toolpack::domain::job::{JobStatus, JobUpdate};
///
/// let update = JobUpdate::new()
///     .status(JobStatus::InProgress)
///     .current_step("Selecting export strategy")
///     .when_status(&[JobStatus::Pending]);
/// assert_eq!(update.status, Some(JobStatus::InProgress));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub steps_total: Option<u32>,
    pub steps_completed: Option<u32>,
    pub progress_percentage: Option<u8>,
    pub current_step: Option<String>,
    pub error_message: Option<Option<String>>,
    pub package_path: Option<Option<String>>,
    pub package_size_bytes: Option<Option<u64>>,
    pub append_completed_step: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Apply only if the current status is one of these
    pub expected_status: Option<Vec<JobStatus>>,
}

impl JobUpdate {
    /// Creates an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the total step count
    pub fn steps_total(mut self, total: u32) -> Self {
        self.steps_total = Some(total);
        self
    }

    /// Sets completed/total-derived progress together
    pub fn progress(mut self, steps_completed: u32, steps_total: u32) -> Self {
        self.steps_completed = Some(steps_completed);
        self.progress_percentage = Some(progress_percentage(steps_completed, steps_total));
        self
    }

    /// Sets the progress percentage directly
    pub fn progress_percentage(mut self, percentage: u8) -> Self {
        self.progress_percentage = Some(percentage.min(100));
        self
    }

    /// Sets the human-readable current step description
    pub fn current_step(mut self, description: impl Into<String>) -> Self {
        self.current_step = Some(description.into());
        self
    }

    /// Sets the error message
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    /// Clears the error message
    pub fn clear_error(mut self) -> Self {
        self.error_message = Some(None);
        self
    }

    /// Records the produced package
    pub fn package(mut self, path: Option<String>, size_bytes: Option<u64>) -> Self {
        self.package_path = Some(path);
        self.package_size_bytes = Some(size_bytes);
        self
    }

    /// Appends a step name to the completed-steps ledger
    pub fn append_completed_step(mut self, step: impl Into<String>) -> Self {
        self.append_completed_step = Some(step.into());
        self
    }

    /// Stamps the terminal timestamp
    pub fn completed_now(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    /// Makes the update conditional on the current status
    pub fn when_status(mut self, expected: &[JobStatus]) -> Self {
        self.expected_status = Some(expected.to_vec());
        self
    }

    /// Whether the update writes nothing
    pub fn is_empty(&self) -> bool {
        JobUpdate {
            expected_status: None,
            ..self.clone()
        } == JobUpdate::default()
    }
}
