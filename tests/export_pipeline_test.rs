//! End-to-end exports through the built-in form, workflow and theme
//! strategies, backed by the in-memory repositories

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use toolpack::adapters::memory::{InMemoryExportJobRepository, InMemoryToolRegistry};
use toolpack::core::export::{ExportOrchestrator, OrchestratorSettings};
use toolpack::domain::{ExportJob, JobStatus, ToolId, ToolRecord, UserId};

struct Pipeline {
    orchestrator: ExportOrchestrator,
    _scratch: TempDir,
}

fn pipeline(tools: Vec<ToolRecord>) -> Pipeline {
    let scratch = TempDir::new().unwrap();
    let orchestrator = ExportOrchestrator::builder(
        Arc::new(InMemoryToolRegistry::with_tools(tools)),
        Arc::new(InMemoryExportJobRepository::new()),
    )
    .settings(OrchestratorSettings {
        scratch_root: scratch.path().to_path_buf(),
        ..OrchestratorSettings::default()
    })
    .build();

    Pipeline {
        orchestrator,
        _scratch: scratch,
    }
}

async fn export(pipeline: &Pipeline, tool_id: &str) -> ExportJob {
    let job = pipeline
        .orchestrator
        .start_export(&ToolId::new(tool_id), &UserId::new("u-1"))
        .await
        .unwrap();

    let wait = async {
        loop {
            let current = pipeline
                .orchestrator
                .get_export_status(&job.job_id)
                .await
                .unwrap();
            if current.is_terminal() && !pipeline.orchestrator.active_jobs().contains(&job.job_id)
            {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .unwrap()
}

fn read_bundle(job: &ExportJob) -> Value {
    let bytes = std::fs::read(job.package_path.as_deref().unwrap()).unwrap();
    assert_eq!(job.package_size_bytes, Some(bytes.len() as u64));
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_form_export_produces_bundle() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "contact-form",
        "Contact",
        json!({
            "toolType": "form",
            "fields": [{"name": "email", "type": "email"}, {"name": "message"}],
        }),
    )]);

    let job = export(&pipeline, "contact-form").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.completed_steps,
        vec![
            "prepare-workspace",
            "write-form-definition",
            "write-manifest",
            "build-package"
        ]
    );
    assert!(job.package_path.as_deref().unwrap().ends_with(".bundle.json"));

    let bundle = read_bundle(&job);
    assert_eq!(bundle["tool_type"], "form");
    let form: Value =
        serde_json::from_str(bundle["files"]["form.json"].as_str().unwrap()).unwrap();
    assert_eq!(form["fields"][1]["name"], "message");
}

#[tokio::test]
async fn test_workflow_export_produces_bundle() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "approval-workflow",
        "Approval",
        json!({
            "states": ["draft", "review", "approved"],
            "transitions": [
                {"from": "draft", "to": "review"},
                {"from": "review", "to": "approved"},
            ],
        }),
    )]);

    let job = export(&pipeline, "approval-workflow").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.steps_total, 5);
    let bundle = read_bundle(&job);
    assert!(bundle["files"]["workflow.json"].is_string());
    assert!(bundle["files"]["transitions.json"].is_string());
}

#[tokio::test]
async fn test_theme_export_produces_stylesheet() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "brand",
        "Brand",
        json!({"toolType": "theme", "palette": {"primary": "#0044cc"}}),
    )]);

    let job = export(&pipeline, "brand").await;

    assert_eq!(job.status, JobStatus::Completed);
    let bundle = read_bundle(&job);
    let css = bundle["files"]["theme.css"].as_str().unwrap();
    assert!(css.contains("--primary: #0044cc;"));
}

#[tokio::test]
async fn test_invalid_tool_data_fails_without_steps() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "empty-form",
        "Empty",
        json!({"toolType": "form", "fields": []}),
    )]);

    let job = export(&pipeline, "empty-form").await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.steps_completed, 0);
    assert!(job.error_message.as_deref().unwrap().contains("no fields"));
    assert!(job.package_path.is_none());
}

#[tokio::test]
async fn test_unsupported_tool_type_fails() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "mystery",
        "Mystery",
        json!({"toolType": "spreadsheet"}),
    )]);

    let job = export(&pipeline, "mystery").await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("Unsupported tool type"));
}

#[tokio::test]
async fn test_workflow_with_unknown_transition_target_fails() {
    let pipeline = pipeline(vec![ToolRecord::new(
        "broken-workflow",
        "Broken",
        json!({
            "states": ["draft"],
            "transitions": [{"from": "draft", "to": "published"}],
        }),
    )]);

    let job = export(&pipeline, "broken-workflow").await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.completed_steps.is_empty());
}
