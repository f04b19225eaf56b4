//! Pre-flight validation
//!
//! Runs once before a job record is created. Errors block job creation;
//! warnings are logged and the export proceeds.

use crate::adapters::database::traits::ToolRegistryRepository;
use crate::core::strategy::has_explicit_tool_type;
use crate::domain::{Result, ToolId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a pre-flight check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreFlightReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PreFlightReport {
    /// A passing report with no findings
    pub fn passed() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Record a blocking problem
    pub fn error(&mut self, message: impl Into<String>) {
        self.success = false;
        self.errors.push(message.into());
    }

    /// Record a non-blocking finding
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Check run before an export job is created
#[async_trait]
pub trait PreFlightValidator: Send + Sync {
    /// Validate that `tool_id` can be exported
    ///
    /// # Errors
    ///
    /// An `Err` means the check itself could not run; findings about the
    /// tool belong in the report.
    async fn validate(&self, tool_id: &ToolId) -> Result<PreFlightReport>;
}

/// Default pre-flight checks over the tool registry and scratch space
pub struct StandardPreFlightValidator {
    tools: Arc<dyn ToolRegistryRepository>,
    scratch_root: PathBuf,
}

impl StandardPreFlightValidator {
    pub fn new(tools: Arc<dyn ToolRegistryRepository>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            scratch_root: scratch_root.into(),
        }
    }
}

#[async_trait]
impl PreFlightValidator for StandardPreFlightValidator {
    async fn validate(&self, tool_id: &ToolId) -> Result<PreFlightReport> {
        let mut report = PreFlightReport::passed();

        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_root).await {
            report.error(format!(
                "scratch space {} is not writable: {}",
                self.scratch_root.display(),
                e
            ));
        }

        // A missing tool is reported by the orchestrator as not found
        let Some(tool) = self.tools.find_by_id(tool_id).await? else {
            return Ok(report);
        };

        if !tool.configuration.is_object() {
            report.error(format!("tool '{tool_id}' has no configuration object"));
        }
        if tool.name.trim().is_empty() {
            report.warn(format!("tool '{tool_id}' has no display name"));
        }
        if !has_explicit_tool_type(&tool) {
            report.warn(format!(
                "tool '{tool_id}' has no explicit toolType, inferring from its id"
            ));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryToolRegistry;
    use crate::domain::ToolRecord;
    use serde_json::json;
    use tempfile::TempDir;

    fn validator(dir: &TempDir, tools: Vec<ToolRecord>) -> StandardPreFlightValidator {
        StandardPreFlightValidator::new(
            Arc::new(InMemoryToolRegistry::with_tools(tools)),
            dir.path().join("exports"),
        )
    }

    #[tokio::test]
    async fn test_clean_tool_passes() {
        let dir = TempDir::new().unwrap();
        let tool = ToolRecord::new("signup-form", "Signup", json!({"toolType": "form"}));
        let report = validator(&dir, vec![tool])
            .validate(&ToolId::new("signup-form"))
            .await
            .unwrap();

        assert_eq!(report, PreFlightReport::passed());
        assert!(dir.path().join("exports").is_dir());
    }

    #[tokio::test]
    async fn test_warnings_do_not_fail() {
        let dir = TempDir::new().unwrap();
        let tool = ToolRecord::new("signup-form", "", json!({}));
        let report = validator(&dir, vec![tool])
            .validate(&ToolId::new("signup-form"))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_non_object_configuration_fails() {
        let dir = TempDir::new().unwrap();
        let tool = ToolRecord::new("signup-form", "Signup", json!(["not", "an", "object"]));
        let report = validator(&dir, vec![tool])
            .validate(&ToolId::new("signup-form"))
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_scratch_root_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let validator = StandardPreFlightValidator::new(
            Arc::new(InMemoryToolRegistry::new()),
            blocker.join("exports"),
        );
        let report = validator.validate(&ToolId::new("missing")).await.unwrap();
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_missing_tool_passes() {
        let dir = TempDir::new().unwrap();
        let report = validator(&dir, Vec::new())
            .validate(&ToolId::new("missing"))
            .await
            .unwrap();
        assert!(report.success);
    }
}
