//! Export orchestrator - owns the export job lifecycle
//!
//! `start_export` validates, creates the job record and detaches the
//! execution routine onto the tokio runtime. Everything that happens after
//! that is observable only through the job record.
//!
//! The execution routine is the only writer of terminal statuses. A cancel
//! request merely moves the job to `CANCELLING` (and flags the in-process
//! token); the routine notices it at the next step boundary, rolls back and
//! records `CANCELLED` or `ROLLED_BACK`.

use crate::adapters::database::traits::{ExportJobRepository, ToolRegistryRepository};
use crate::config::ExportConfig;
use crate::core::export::cancellation::{CancellationRegistry, CancellationToken, Registration};
use crate::core::export::context::ExportContext;
use crate::core::export::executor::{RetryPolicy, StepExecutor};
use crate::core::export::rollback::{remove_working_dir, roll_back_job, RollbackReport};
use crate::core::permission::{NonEmptyIdsPermission, PermissionHook};
use crate::core::preflight::{PreFlightValidator, StandardPreFlightValidator};
use crate::core::strategy::{ExportStep, StrategyRegistry};
use crate::domain::context::ResultExt;
use crate::domain::{
    ExportJob, JobId, JobStatus, JobUpdate, NewExportJob, Result, ToolId, ToolRecord,
    ToolpackError, UserId,
};
use crate::{log_error_with_context, log_job_transition};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Error recorded for jobs found unfinished without a live execution
pub const INTERRUPTED_MESSAGE: &str = "Export interrupted before completion";

/// Runtime settings of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Root under which each job gets its own working directory
    pub scratch_root: PathBuf,

    /// Per-step timeout and retry policy
    pub retry: RetryPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from(crate::config::schema::DEFAULT_SCRATCH_ROOT),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            scratch_root: PathBuf::from(&config.scratch_root),
            retry: RetryPolicy::from_config(config),
        }
    }
}

/// Outcome of recovering one orphaned job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredJob {
    pub job_id: JobId,
    pub previous_status: JobStatus,
    pub final_status: JobStatus,
    pub rolled_back_steps: Vec<String>,
}

/// How the step loop ended without an error
enum Outcome {
    Completed,
    Cancelled,
}

/// Error raised inside the execution routine, with the failure point if known
struct Failure {
    error: ToolpackError,
    at: Option<String>,
}

impl From<ToolpackError> for Failure {
    fn from(error: ToolpackError) -> Self {
        Self { error, at: None }
    }
}

/// Mutable state of one execution
struct Execution {
    ctx: ExportContext,
    token: CancellationToken,
    steps: Vec<Box<dyn ExportStep>>,
    completed: usize,
}

impl Execution {
    fn total(&self) -> u32 {
        self.steps.len() as u32
    }
}

struct Inner {
    tools: Arc<dyn ToolRegistryRepository>,
    jobs: Arc<dyn ExportJobRepository>,
    strategies: StrategyRegistry,
    preflight: Arc<dyn PreFlightValidator>,
    permission: Arc<dyn PermissionHook>,
    settings: OrchestratorSettings,
    executor: StepExecutor,
    cancellations: CancellationRegistry,
    shutdown: Option<watch::Receiver<bool>>,
}

/// Builder for [`ExportOrchestrator`]
pub struct ExportOrchestratorBuilder {
    tools: Arc<dyn ToolRegistryRepository>,
    jobs: Arc<dyn ExportJobRepository>,
    strategies: Option<StrategyRegistry>,
    preflight: Option<Arc<dyn PreFlightValidator>>,
    permission: Option<Arc<dyn PermissionHook>>,
    settings: OrchestratorSettings,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ExportOrchestratorBuilder {
    /// Strategy registry (defaults to the built-in families)
    pub fn strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Pre-flight validator (defaults to [`StandardPreFlightValidator`])
    pub fn preflight(mut self, preflight: Arc<dyn PreFlightValidator>) -> Self {
        self.preflight = Some(preflight);
        self
    }

    /// Permission hook (defaults to [`NonEmptyIdsPermission`])
    pub fn permission(mut self, permission: Arc<dyn PermissionHook>) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Process-wide shutdown signal; `true` cancels every running job
    pub fn shutdown_signal(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn build(self) -> ExportOrchestrator {
        let preflight = self.preflight.unwrap_or_else(|| {
            Arc::new(StandardPreFlightValidator::new(
                self.tools.clone(),
                self.settings.scratch_root.clone(),
            ))
        });

        ExportOrchestrator {
            inner: Arc::new(Inner {
                tools: self.tools,
                jobs: self.jobs,
                strategies: self.strategies.unwrap_or_else(StrategyRegistry::with_defaults),
                preflight,
                permission: self
                    .permission
                    .unwrap_or_else(|| Arc::new(NonEmptyIdsPermission)),
                executor: StepExecutor::new(self.settings.retry),
                settings: self.settings,
                cancellations: CancellationRegistry::new(),
                shutdown: self.shutdown,
            }),
        }
    }
}

/// Cheaply cloneable handle to the export engine
#[derive(Clone)]
pub struct ExportOrchestrator {
    inner: Arc<Inner>,
}

impl ExportOrchestrator {
    pub fn builder(
        tools: Arc<dyn ToolRegistryRepository>,
        jobs: Arc<dyn ExportJobRepository>,
    ) -> ExportOrchestratorBuilder {
        ExportOrchestratorBuilder {
            tools,
            jobs,
            strategies: None,
            preflight: None,
            permission: None,
            settings: OrchestratorSettings::default(),
            shutdown: None,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    /// Start exporting a tool
    ///
    /// Returns the `PENDING` job as soon as it is stored; execution continues
    /// in the background.
    ///
    /// # Errors
    ///
    /// - `PreFlightFailed` when pre-flight validation reports errors
    /// - `ToolNotFound` when the tool does not exist
    /// - `Authorization` when the permission hook denies the export
    ///
    /// No job record exists when any of these is returned.
    pub async fn start_export(&self, tool_id: &ToolId, user_id: &UserId) -> Result<ExportJob> {
        let report = self.inner.preflight.validate(tool_id).await?;
        for warning in &report.warnings {
            tracing::warn!(tool_id = %tool_id, warning = %warning, "Pre-flight warning");
        }
        if !report.success {
            return Err(ToolpackError::PreFlightFailed(report.errors));
        }

        let tool = self
            .inner
            .tools
            .find_by_id(tool_id)
            .await?
            .ok_or_else(|| ToolpackError::ToolNotFound(tool_id.to_string()))?;

        if !self.inner.permission.can_export(user_id, tool_id).await {
            return Err(ToolpackError::Authorization(format!(
                "user '{user_id}' may not export tool '{tool_id}'"
            )));
        }

        let job = self
            .inner
            .jobs
            .create(NewExportJob::new(tool_id.clone(), user_id.clone()))
            .await?;
        tracing::info!(
            job_id = %job.job_id,
            tool_id = %tool_id,
            user_id = %user_id,
            "Export job created"
        );

        // Registered before spawning so an immediate cancel is never missed
        let (registration, token) =
            Registration::new(self.inner.cancellations.clone(), job.job_id);
        let this = self.clone();
        let spawned = job.clone();
        tokio::spawn(async move {
            let _registration = registration;
            this.supervise(spawned, tool, token).await;
        });

        Ok(job)
    }

    /// Current state of a job
    ///
    /// # Errors
    ///
    /// Returns `JobNotFound` if the job does not exist.
    pub async fn get_export_status(&self, job_id: &JobId) -> Result<ExportJob> {
        self.inner
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ToolpackError::JobNotFound(job_id.to_string()))
    }

    /// Most recently created jobs, newest first
    pub async fn list_exports(&self, limit: usize) -> Result<Vec<ExportJob>> {
        self.inner.jobs.list_recent(limit).await
    }

    /// Request cancellation of a job
    ///
    /// Moves the job to `CANCELLING` and returns without waiting for the
    /// execution routine to roll back.
    ///
    /// # Errors
    ///
    /// - `JobNotFound` when the job does not exist
    /// - `Authorization` when `user_id` does not own the job
    /// - `InvalidState` when the job is not `PENDING` or `IN_PROGRESS`
    pub async fn cancel_export(&self, job_id: &JobId, user_id: &UserId) -> Result<()> {
        let job = self.get_export_status(job_id).await?;

        if !job.is_owned_by(user_id) {
            return Err(ToolpackError::Authorization(format!(
                "user '{user_id}' does not own export job {job_id}"
            )));
        }
        if !job.status.is_cancellable() {
            return Err(ToolpackError::InvalidState(format!(
                "export job {job_id} is {} and cannot be cancelled",
                job.status
            )));
        }

        let applied = self
            .inner
            .jobs
            .update(
                job_id,
                JobUpdate::new()
                    .status(JobStatus::Cancelling)
                    .current_step("Cancellation requested")
                    .when_status(&[JobStatus::Pending, JobStatus::InProgress]),
            )
            .await?;

        if !applied {
            let current = self.get_export_status(job_id).await?;
            return Err(ToolpackError::InvalidState(format!(
                "export job {job_id} is {} and cannot be cancelled",
                current.status
            )));
        }

        self.inner.cancellations.cancel(job_id);
        log_job_transition!(job_id, JobStatus::Cancelling, "Cancellation requested");
        Ok(())
    }

    /// Jobs with a live execution in this process
    pub fn active_jobs(&self) -> Vec<JobId> {
        self.inner.cancellations.active()
    }

    /// Reconcile jobs left unfinished by a previous process
    ///
    /// Every `PENDING`, `IN_PROGRESS` or `CANCELLING` job without a live
    /// execution here is marked failed (or cancelled) and the steps in its
    /// completed-steps ledger are rolled back in reverse.
    pub async fn recover_orphaned_jobs(&self) -> Result<Vec<RecoveredJob>> {
        let mut recovered = Vec::new();

        for job in self.inner.jobs.find_unfinished().await? {
            if self.inner.cancellations.is_active(&job.job_id) {
                continue;
            }
            match self.recover_job(&job).await {
                Ok(Some(result)) => recovered.push(result),
                Ok(None) => {}
                Err(e) => {
                    log_error_with_context!(e, format!("Failed to recover export job {}", job.job_id));
                }
            }
        }

        if !recovered.is_empty() {
            tracing::info!(count = recovered.len(), "Recovered orphaned export jobs");
        }
        Ok(recovered)
    }

    async fn supervise(&self, job: ExportJob, tool: ToolRecord, token: CancellationToken) {
        let job_id = job.job_id;
        let runner = self.clone();
        let handle = tokio::spawn(async move { runner.execute(job, tool, token).await });

        if let Err(e) = handle.await {
            tracing::error!(job_id = %job_id, error = %e, "Export execution aborted");
            // The durable ledger still describes what must be undone
            match self.get_export_status(&job_id).await {
                Ok(job) if !job.is_terminal() => {
                    if let Err(e) = self.recover_job(&job).await {
                        log_error_with_context!(e, "Failed to recover aborted export job");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log_error_with_context!(e, "Failed to load aborted export job");
                }
            }
        }
    }

    /// The execution routine, run once per job
    async fn execute(&self, job: ExportJob, tool: ToolRecord, token: CancellationToken) {
        let working_dir =
            ExportContext::working_dir_for(&self.inner.settings.scratch_root, &job.job_id);
        let mut run = Execution {
            ctx: ExportContext::new(job.job_id, job.user_id.clone(), Arc::new(tool), working_dir),
            token,
            steps: Vec::new(),
            completed: 0,
        };

        let result = match self.drive(&mut run).await {
            Ok(Outcome::Completed) => Ok(()),
            Ok(Outcome::Cancelled) => self.finish_cancelled(&mut run).await,
            Err(failure) => self.finish_failed(&mut run, failure).await,
        };

        if let Err(e) = result {
            log_error_with_context!(e, format!("Failed to finalize export job {}", job.job_id));
        }
    }

    async fn drive(&self, run: &mut Execution) -> std::result::Result<Outcome, Failure> {
        let job_id = run.ctx.job_id;
        let jobs = &self.inner.jobs;

        let started = jobs
            .update(
                &job_id,
                JobUpdate::new()
                    .status(JobStatus::InProgress)
                    .current_step("Preparing export")
                    .when_status(&[JobStatus::Pending]),
            )
            .await?;
        if !started {
            return Ok(Outcome::Cancelled);
        }
        log_job_transition!(job_id, JobStatus::InProgress);

        let tool = run.ctx.tool.clone();
        let strategy = self.inner.strategies.select(&tool)?;
        strategy.validate_tool_data(&tool)?;
        run.steps = strategy.steps(&tool)?;
        let total = run.total();

        jobs.update(
            &job_id,
            JobUpdate::new().steps_total(total).progress(0, total),
        )
        .await?;
        tracing::info!(
            job_id = %job_id,
            tool_id = %tool.id,
            tool_type = %strategy.tool_type(),
            steps = total,
            "Export steps planned"
        );

        tokio::fs::create_dir_all(&run.ctx.working_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create working directory {}",
                    run.ctx.working_dir.display()
                )
            })?;

        for index in 0..run.steps.len() {
            if self.cancel_requested(run).await? {
                return Ok(Outcome::Cancelled);
            }

            let position = index as u32 + 1;
            let step = &run.steps[index];
            jobs.update(
                &job_id,
                JobUpdate::new()
                    .current_step(format!("Step {position}/{total}: {}", step.description()))
                    .progress(index as u32, total),
            )
            .await?;

            match self.inner.executor.run(step.as_ref(), &mut run.ctx).await {
                Ok(attempts) => {
                    run.completed += 1;
                    jobs.update(
                        &job_id,
                        JobUpdate::new()
                            .progress(position, total)
                            .append_completed_step(step.name())
                            .current_step(format!(
                                "Completed step {position}/{total}: {}",
                                step.description()
                            )),
                    )
                    .await?;
                    tracing::info!(
                        job_id = %job_id,
                        step = step.name(),
                        attempts,
                        completed = position,
                        total,
                        "Export step completed"
                    );
                }
                Err(e) => {
                    return Err(Failure {
                        at: Some(format!(
                            "Failed at step {position}/{total}: {}",
                            step.description()
                        )),
                        error: e.into(),
                    });
                }
            }
        }

        let completed = jobs
            .update(
                &job_id,
                JobUpdate::new()
                    .status(JobStatus::Completed)
                    .progress(total, total)
                    .current_step("Export completed")
                    .package(run.ctx.package_path(), run.ctx.package_size_bytes())
                    .clear_error()
                    .completed_now()
                    .when_status(&[JobStatus::InProgress]),
            )
            .await?;
        if !completed {
            // Cancelled while the last step was running
            return Ok(Outcome::Cancelled);
        }

        log_job_transition!(
            job_id,
            JobStatus::Completed,
            run.ctx.package_path().unwrap_or_default()
        );
        Ok(Outcome::Completed)
    }

    async fn cancel_requested(&self, run: &Execution) -> Result<bool> {
        if run.token.is_cancelled() {
            return Ok(true);
        }
        if let Some(shutdown) = &self.inner.shutdown {
            if *shutdown.borrow() {
                tracing::warn!(job_id = %run.ctx.job_id, "Shutdown requested, cancelling export");
                return Ok(true);
            }
        }
        let job = self.get_export_status(&run.ctx.job_id).await?;
        Ok(job.status.is_cancel_requested())
    }

    async fn finish_cancelled(&self, run: &mut Execution) -> Result<()> {
        let job_id = run.ctx.job_id;
        let description = if run.completed == 0 {
            "Cancelled before any step completed".to_string()
        } else {
            format!("Cancelled after step {}/{}", run.completed, run.total())
        };

        self.inner
            .jobs
            .update(
                &job_id,
                JobUpdate::new()
                    .status(JobStatus::Cancelled)
                    .current_step(description.clone())
                    .completed_now(),
            )
            .await?;
        log_job_transition!(job_id, JobStatus::Cancelled, description);

        self.roll_back(run, None).await.map(|_| ())
    }

    async fn finish_failed(&self, run: &mut Execution, failure: Failure) -> Result<()> {
        let job_id = run.ctx.job_id;
        let message = failure.error.to_string();
        let at = failure.at.unwrap_or_else(|| "Export failed".to_string());

        self.inner
            .jobs
            .update(
                &job_id,
                JobUpdate::new()
                    .status(JobStatus::Failed)
                    .error_message(message.clone())
                    .current_step(at)
                    .completed_now(),
            )
            .await?;
        log_job_transition!(job_id, JobStatus::Failed, message.as_str());

        self.roll_back(run, Some(&message)).await.map(|_| ())
    }

    async fn roll_back(
        &self,
        run: &mut Execution,
        reason: Option<&str>,
    ) -> Result<RollbackReport> {
        let completed = &run.steps[..run.completed];
        roll_back_job(self.inner.jobs.as_ref(), completed, &mut run.ctx, reason).await
    }

    /// Fail or cancel an orphaned job and undo its ledger
    async fn recover_job(&self, job: &ExportJob) -> Result<Option<RecoveredJob>> {
        let final_status = if job.status == JobStatus::Cancelling {
            JobStatus::Cancelled
        } else {
            JobStatus::Failed
        };

        let mut update = JobUpdate::new()
            .status(final_status)
            .current_step("Recovered after interruption")
            .completed_now()
            .when_status(&JobStatus::UNFINISHED);
        if final_status == JobStatus::Failed {
            update = update.error_message(INTERRUPTED_MESSAGE);
        }
        if !self.inner.jobs.update(&job.job_id, update).await? {
            return Ok(None);
        }
        log_job_transition!(job.job_id, final_status, INTERRUPTED_MESSAGE);

        let working_dir =
            ExportContext::working_dir_for(&self.inner.settings.scratch_root, &job.job_id);
        let completed = self.rebuild_completed_steps(job).await;

        let mut recovered = RecoveredJob {
            job_id: job.job_id,
            previous_status: job.status,
            final_status,
            rolled_back_steps: Vec::new(),
        };

        match completed {
            Ok((tool, completed)) => {
                let mut ctx =
                    ExportContext::new(job.job_id, job.user_id.clone(), Arc::new(tool), working_dir);
                let reason = (final_status == JobStatus::Failed).then_some(INTERRUPTED_MESSAGE);
                let report =
                    roll_back_job(self.inner.jobs.as_ref(), &completed, &mut ctx, reason).await?;
                if !completed.is_empty() {
                    recovered.final_status = JobStatus::RolledBack;
                }
                recovered.rolled_back_steps = report.attempted;
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.job_id,
                    ledger = ?job.completed_steps,
                    error = %e,
                    "Cannot rebuild export steps, completed steps left in place"
                );
                remove_working_dir(&working_dir).await;
            }
        }

        Ok(Some(recovered))
    }

    /// Rebuild the steps named in a job's ledger, in completion order
    async fn rebuild_completed_steps(
        &self,
        job: &ExportJob,
    ) -> Result<(ToolRecord, Vec<Box<dyn ExportStep>>)> {
        let tool = self
            .inner
            .tools
            .find_by_id(&job.tool_id)
            .await?
            .ok_or_else(|| ToolpackError::ToolNotFound(job.tool_id.to_string()))?;

        let mut by_name: HashMap<String, Box<dyn ExportStep>> = self
            .inner
            .strategies
            .select(&tool)?
            .steps(&tool)?
            .into_iter()
            .map(|step| (step.name().to_string(), step))
            .collect();

        let mut completed = Vec::with_capacity(job.completed_steps.len());
        for name in &job.completed_steps {
            match by_name.remove(name) {
                Some(step) => completed.push(step),
                None => tracing::warn!(
                    job_id = %job.job_id,
                    step = %name,
                    "Ledger step no longer produced by strategy"
                ),
            }
        }
        Ok((tool, completed))
    }
}
