//! In-memory export job repository

use crate::adapters::database::traits::ExportJobRepository;
use crate::domain::ids::JobId;
use crate::domain::job::{ExportJob, JobStatus, JobUpdate, NewExportJob};
use crate::domain::{Result, ToolpackError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Export job storage held in process memory
///
/// Each create/update takes the write lock for the whole read-modify-write,
/// so updates to the same job are atomic. Records are lost when the process
/// exits.
#[derive(Default)]
pub struct InMemoryExportJobRepository {
    jobs: RwLock<HashMap<JobId, ExportJob>>,
}

impl InMemoryExportJobRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is (used to seed fixtures and recovery scenarios)
    pub async fn insert(&self, job: ExportJob) {
        self.jobs.write().await.insert(job.job_id, job);
    }

    /// Number of stored jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no job has been stored
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl ExportJobRepository for InMemoryExportJobRepository {
    async fn create(&self, new_job: NewExportJob) -> Result<ExportJob> {
        let job = new_job.into_job(JobId::generate());
        self.jobs.write().await.insert(job.job_id, job.clone());

        tracing::debug!(job_id = %job.job_id, tool_id = %job.tool_id, "Created export job in memory");
        Ok(job)
    }

    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<ExportJob>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn update(&self, job_id: &JobId, update: JobUpdate) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| ToolpackError::JobNotFound(job_id.to_string()))?;
        Ok(job.apply(&update))
    }

    async fn find_unfinished(&self) -> Result<Vec<ExportJob>> {
        let mut unfinished: Vec<ExportJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| JobStatus::UNFINISHED.contains(&job.status))
            .cloned()
            .collect();
        unfinished.sort_by_key(|job| job.created_at);
        Ok(unfinished)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>> {
        let mut jobs: Vec<ExportJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ToolId, UserId};

    fn new_job() -> NewExportJob {
        NewExportJob::new(ToolId::new("contact-form"), UserId::new("user-1"))
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryExportJobRepository::new();
        let job = repo.create(new_job()).await.unwrap();

        let found = repo.find_by_id(&job.job_id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Pending);
        assert_eq!(found.tool_id.as_str(), "contact-form");
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = InMemoryExportJobRepository::new();
        assert!(repo.find_by_id(&JobId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_job_errors() {
        let repo = InMemoryExportJobRepository::new();
        let err = repo
            .update(&JobId::generate(), JobUpdate::new().status(JobStatus::Failed))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolpackError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_guarded_update() {
        let repo = InMemoryExportJobRepository::new();
        let job = repo.create(new_job()).await.unwrap();

        let applied = repo
            .update(
                &job.job_id,
                JobUpdate::new()
                    .status(JobStatus::Cancelling)
                    .when_status(&[JobStatus::Pending, JobStatus::InProgress]),
            )
            .await
            .unwrap();
        assert!(applied);

        let applied = repo
            .update(
                &job.job_id,
                JobUpdate::new()
                    .status(JobStatus::InProgress)
                    .when_status(&[JobStatus::Pending]),
            )
            .await
            .unwrap();
        assert!(!applied);

        let stored = repo.find_by_id(&job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Cancelling);
    }

    #[tokio::test]
    async fn test_find_unfinished_and_list_recent() {
        let repo = InMemoryExportJobRepository::new();
        let first = repo.create(new_job()).await.unwrap();
        let second = repo.create(new_job()).await.unwrap();
        repo.update(
            &first.job_id,
            JobUpdate::new().status(JobStatus::Completed).completed_now(),
        )
        .await
        .unwrap();

        let unfinished = repo.find_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].job_id, second.job_id);

        let recent = repo.list_recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(repo.len().await, 2);
    }
}
