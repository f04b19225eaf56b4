//! Shared fixtures for orchestrator integration tests
//!
//! `ScriptedStep` records every execute/rollback call into a shared event
//! log and can be told to fail, hang, panic or block on a gate.
//! `HistoryRepository` keeps a snapshot of the job after every applied write
//! so tests can check what an observer would have seen.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use toolpack::adapters::database::{ExportJobRepository, ToolRegistryRepository};
use toolpack::adapters::memory::{InMemoryExportJobRepository, InMemoryToolRegistry};
use toolpack::core::export::{
    ExportContext, ExportOrchestrator, ExportOrchestratorBuilder, OrchestratorSettings,
    RetryPolicy,
};
use toolpack::core::strategy::{ExportStep, ExportStrategy, StrategyRegistry, ToolType};
use toolpack::domain::{
    ExportJob, JobId, JobUpdate, NewExportJob, Result, ToolRecord, ToolpackError,
};

pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recorded(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

/// Pair of notifications used to pause a step mid-execution
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Clone)]
pub struct ScriptedStep {
    pub name: String,
    pub retryable: bool,
    pub failures: u32,
    pub rollback_fails: bool,
    pub panics: bool,
    pub delay: Duration,
    pub gate: Option<Gate>,
    pub calls: Arc<AtomicU32>,
    pub events: Events,
}

impl ScriptedStep {
    pub fn new(name: &str, events: &Events) -> Self {
        Self {
            name: name.to_string(),
            retryable: false,
            failures: 0,
            rollback_fails: false,
            panics: false,
            delay: Duration::ZERO,
            gate: None,
            calls: Arc::new(AtomicU32::new(0)),
            events: events.clone(),
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Fail the first `n` attempts
    pub fn failing(mut self, n: u32) -> Self {
        self.failures = n;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing(u32::MAX)
    }

    pub fn rollback_fails(mut self) -> Self {
        self.rollback_fails = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{event}:{}", self.name));
    }
}

#[async_trait]
impl ExportStep for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.name
    }

    fn retryable(&self) -> bool {
        self.retryable
    }

    async fn execute(&self, ctx: &mut ExportContext) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.record("execute");

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.panics {
            panic!("step {} panicked", self.name);
        }
        tokio::time::sleep(self.delay).await;

        if call <= self.failures {
            return Err(ToolpackError::Other(format!(
                "{} attempt {call} failed",
                self.name
            )));
        }
        tokio::fs::write(ctx.path(&self.name), b"done").await?;
        Ok(())
    }

    async fn rollback(&self, ctx: &mut ExportContext) -> Result<()> {
        self.record("rollback");
        if self.rollback_fails {
            return Err(ToolpackError::Other(format!("{} cannot be undone", self.name)));
        }
        let _ = tokio::fs::remove_file(ctx.path(&self.name)).await;
        Ok(())
    }
}

/// Strategy that hands out clones of a fixed step list
pub struct ScriptedStrategy {
    pub steps: Vec<ScriptedStep>,
}

impl ExportStrategy for ScriptedStrategy {
    fn tool_type(&self) -> ToolType {
        ToolType::Form
    }

    fn validate_tool_data(&self, _tool: &ToolRecord) -> Result<()> {
        Ok(())
    }

    fn steps(&self, _tool: &ToolRecord) -> Result<Vec<Box<dyn ExportStep>>> {
        Ok(self
            .steps
            .iter()
            .cloned()
            .map(|step| Box::new(step) as Box<dyn ExportStep>)
            .collect())
    }
}

/// Job repository that keeps every stored version of every job
#[derive(Default)]
pub struct HistoryRepository {
    inner: InMemoryExportJobRepository,
    history: Mutex<Vec<ExportJob>>,
}

impl HistoryRepository {
    pub fn history(&self, job_id: &JobId) -> Vec<ExportJob> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|job| job.job_id == *job_id)
            .cloned()
            .collect()
    }

    pub async fn insert(&self, job: ExportJob) {
        self.inner.insert(job).await;
    }
}

#[async_trait]
impl ExportJobRepository for HistoryRepository {
    async fn create(&self, new_job: NewExportJob) -> Result<ExportJob> {
        let job = self.inner.create(new_job).await?;
        self.history.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<ExportJob>> {
        self.inner.find_by_id(job_id).await
    }

    async fn update(&self, job_id: &JobId, update: JobUpdate) -> Result<bool> {
        let applied = self.inner.update(job_id, update).await?;
        if applied {
            if let Some(job) = self.inner.find_by_id(job_id).await? {
                self.history.lock().unwrap().push(job);
            }
        }
        Ok(applied)
    }

    async fn find_unfinished(&self) -> Result<Vec<ExportJob>> {
        self.inner.find_unfinished().await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>> {
        self.inner.list_recent(limit).await
    }
}

pub const TOOL_ID: &str = "contact-form";
pub const USER_ID: &str = "u-1";

pub fn form_tool(id: &str) -> ToolRecord {
    ToolRecord::new(
        id,
        "Contact form",
        serde_json::json!({
            "toolType": "form",
            "fields": [{"name": "email", "type": "email"}],
        }),
    )
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff_base: Duration::from_millis(20),
        step_timeout: Duration::from_millis(500),
    }
}

pub struct Harness {
    pub orchestrator: ExportOrchestrator,
    pub jobs: Arc<HistoryRepository>,
    pub tools: Arc<InMemoryToolRegistry>,
    pub scratch: TempDir,
}

impl Harness {
    /// Orchestrator whose form strategy runs `steps`
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self::with(steps, |builder| builder)
    }

    pub fn with(
        steps: Vec<ScriptedStep>,
        configure: impl FnOnce(ExportOrchestratorBuilder) -> ExportOrchestratorBuilder,
    ) -> Self {
        let scratch = TempDir::new().unwrap();
        let tools = Arc::new(InMemoryToolRegistry::with_tools([form_tool(TOOL_ID)]));
        let jobs = Arc::new(HistoryRepository::default());

        let mut strategies = StrategyRegistry::new();
        strategies.register(Arc::new(ScriptedStrategy { steps }));

        let builder = ExportOrchestrator::builder(tools.clone(), jobs.clone())
            .strategies(strategies)
            .settings(OrchestratorSettings {
                scratch_root: scratch.path().to_path_buf(),
                retry: fast_policy(),
            });

        Self {
            orchestrator: configure(builder).build(),
            jobs,
            tools,
            scratch,
        }
    }

    pub fn tool_registry(&self) -> Arc<dyn ToolRegistryRepository> {
        self.tools.clone()
    }

    pub async fn start(&self) -> ExportJob {
        self.orchestrator
            .start_export(&TOOL_ID.into(), &USER_ID.into())
            .await
            .unwrap()
    }

    /// Wait until the job is terminal and its execution (rollback included) ended
    pub async fn settle(&self, job_id: &JobId) -> ExportJob {
        let wait = async {
            loop {
                let job = self.orchestrator.get_export_status(job_id).await.unwrap();
                if job.is_terminal() && !self.orchestrator.active_jobs().contains(job_id) {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .expect("export job did not settle")
    }

    pub fn working_dir(&self, job_id: &JobId) -> std::path::PathBuf {
        ExportContext::working_dir_for(self.scratch.path(), job_id)
    }
}
