//! PostgreSQL repository implementations
//!
//! Both repositories share one [`PostgreSQLClient`] pool.

use crate::adapters::database::traits::{ExportJobRepository, ToolRegistryRepository};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    build_job_update, job_from_row, tool_from_row, JOB_COLUMNS, TOOL_COLUMNS,
};
use crate::domain::ids::{JobId, ToolId};
use crate::domain::job::{ExportJob, JobStatus, JobUpdate, NewExportJob};
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use async_trait::async_trait;
use std::sync::Arc;

/// Tool registry backed by the `tools` table
pub struct PostgreSQLToolRegistry {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLToolRegistry {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolRegistryRepository for PostgreSQLToolRegistry {
    async fn find_by_id(&self, tool_id: &ToolId) -> Result<Option<ToolRecord>> {
        let query = format!("SELECT {} FROM tools WHERE id = $1", TOOL_COLUMNS);
        let row = self.client.query_opt(&query, &[&tool_id.as_str()]).await?;
        row.as_ref().map(tool_from_row).transpose()
    }
}

/// Export job repository backed by the `export_jobs` table
///
/// Every write is a single statement, so updates to one job are atomic and
/// status guards are evaluated by the database.
pub struct PostgreSQLExportJobRepository {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLExportJobRepository {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool> {
        let row = self
            .client
            .query_opt(
                "SELECT 1 FROM export_jobs WHERE job_id = $1",
                &[job_id.as_uuid()],
            )
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ExportJobRepository for PostgreSQLExportJobRepository {
    async fn create(&self, new_job: NewExportJob) -> Result<ExportJob> {
        let job = ExportJob::new(JobId::generate(), new_job.tool_id, new_job.user_id);

        let statement = format!(
            "INSERT INTO export_jobs (job_id, tool_id, user_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            JOB_COLUMNS
        );
        let rows = self
            .client
            .query(
                &statement,
                &[
                    job.job_id.as_uuid(),
                    &job.tool_id.as_str(),
                    &job.user_id.as_str(),
                    &job.status.as_str(),
                    &job.created_at,
                    &job.updated_at,
                ],
            )
            .await?;

        let row = rows.first().ok_or_else(|| {
            ToolpackError::Database(format!("Insert of job {} returned no row", job.job_id))
        })?;
        let stored = job_from_row(row)?;

        tracing::debug!(job_id = %stored.job_id, tool_id = %stored.tool_id, "Export job created");
        Ok(stored)
    }

    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<ExportJob>> {
        let query = format!("SELECT {} FROM export_jobs WHERE job_id = $1", JOB_COLUMNS);
        let row = self.client.query_opt(&query, &[job_id.as_uuid()]).await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn update(&self, job_id: &JobId, update: JobUpdate) -> Result<bool> {
        let statement = build_job_update(job_id, &update)?;
        let affected = self
            .client
            .execute(&statement.sql, &statement.param_refs())
            .await?;

        if affected > 0 {
            return Ok(true);
        }
        if self.exists(job_id).await? {
            tracing::debug!(job_id = %job_id, "Guarded job update rejected");
            Ok(false)
        } else {
            Err(ToolpackError::JobNotFound(job_id.to_string()))
        }
    }

    async fn find_unfinished(&self) -> Result<Vec<ExportJob>> {
        let query = format!(
            "SELECT {} FROM export_jobs WHERE status = ANY($1) ORDER BY created_at",
            JOB_COLUMNS
        );
        let unfinished: Vec<&str> = JobStatus::UNFINISHED.iter().map(|s| s.as_str()).collect();
        let rows = self.client.query(&query, &[&unfinished]).await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>> {
        let query = format!(
            "SELECT {} FROM export_jobs ORDER BY created_at DESC LIMIT $1",
            JOB_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.client.query(&query, &[&limit]).await?;
        rows.iter().map(job_from_row).collect()
    }
}
