//! Repository abstraction traits
//!
//! This module defines the persistence collaborators of the export
//! orchestrator. Backends only need simple create/find/update-by-id
//! semantics; every update must be atomic per job id.

use crate::domain::ids::{JobId, ToolId};
use crate::domain::job::{ExportJob, JobUpdate, NewExportJob};
use crate::domain::tool::ToolRecord;
use crate::domain::Result;
use async_trait::async_trait;

/// Read access to the tool registry
#[async_trait]
pub trait ToolRegistryRepository: Send + Sync {
    /// Find a tool by id
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(ToolRecord))` if found, `Ok(None)` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails for reasons other than "not found".
    async fn find_by_id(&self, tool_id: &ToolId) -> Result<Option<ToolRecord>>;
}

/// Durable storage for export job records
///
/// This is the only state shared between concurrently running jobs.
#[async_trait]
pub trait ExportJobRepository: Send + Sync {
    /// Create a job record in `PENDING`
    ///
    /// The repository assigns the job id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn create(&self, new_job: NewExportJob) -> Result<ExportJob>;

    /// Find a job by id
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(ExportJob))` if found, `Ok(None)` if not found.
    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<ExportJob>>;

    /// Apply a partial update to a job
    ///
    /// Fields not set in `update` must not be modified. When the update
    /// carries a status guard, the write is skipped unless the stored status
    /// matches.
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` if the update was applied, `Ok(false)` if the
    /// status guard rejected it.
    ///
    /// # Errors
    ///
    /// Returns `JobNotFound` if the job does not exist, or a storage error.
    async fn update(&self, job_id: &JobId, update: JobUpdate) -> Result<bool>;

    /// Jobs left in `PENDING`, `IN_PROGRESS` or `CANCELLING`
    async fn find_unfinished(&self) -> Result<Vec<ExportJob>>;

    /// Most recently created jobs, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>>;
}
