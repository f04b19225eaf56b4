//! Per-execution export context
//!
//! One context exists per job execution. It is never persisted; steps use the
//! metadata map to hand data forward (for example the final package path).
//! Steps run one at a time, so the context is only ever borrowed by one step.

use crate::domain::ids::{JobId, ToolId, UserId};
use crate::domain::tool::ToolRecord;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metadata key holding the produced package path
pub const PACKAGE_PATH_KEY: &str = "package_path";

/// Metadata key holding the produced package size in bytes
pub const PACKAGE_SIZE_KEY: &str = "package_size_bytes";

/// Metadata key holding the SHA-256 checksum of the package
pub const PACKAGE_CHECKSUM_KEY: &str = "package_checksum";

/// Mutable state shared by the steps of one export job
#[derive(Debug, Clone)]
pub struct ExportContext {
    /// Job being executed
    pub job_id: JobId,

    /// Tool being exported
    pub tool_id: ToolId,

    /// User who started the export
    pub user_id: UserId,

    /// Job-exclusive scratch directory
    pub working_dir: PathBuf,

    /// Immutable snapshot of the tool record
    pub tool: Arc<ToolRecord>,

    metadata: Map<String, Value>,
}

impl ExportContext {
    /// Create a context for a job
    pub fn new(
        job_id: JobId,
        user_id: UserId,
        tool: Arc<ToolRecord>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id,
            tool_id: tool.id.clone(),
            user_id,
            working_dir: working_dir.into(),
            tool,
            metadata: Map::new(),
        }
    }

    /// Scratch directory path for a job under `scratch_root`
    pub fn working_dir_for(scratch_root: &Path, job_id: &JobId) -> PathBuf {
        scratch_root.join(job_id.to_string())
    }

    /// Resolve a path relative to the working directory
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(relative)
    }

    /// Store a metadata value, returning the previous one
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Read a metadata value
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Remove a metadata value
    pub fn remove_metadata(&mut self, key: &str) -> Option<Value> {
        self.metadata.remove(key)
    }

    /// All metadata
    pub fn metadata_map(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Package path recorded by the packaging step
    pub fn package_path(&self) -> Option<String> {
        self.metadata(PACKAGE_PATH_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Package size recorded by the packaging step
    pub fn package_size_bytes(&self) -> Option<u64> {
        self.metadata(PACKAGE_SIZE_KEY).and_then(Value::as_u64)
    }

    /// Package checksum recorded by the packaging step
    pub fn package_checksum(&self) -> Option<&str> {
        self.metadata(PACKAGE_CHECKSUM_KEY).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ExportContext {
        let tool = Arc::new(ToolRecord::new("contact-form", "Contact", json!({})));
        ExportContext::new(
            JobId::generate(),
            UserId::new("user-1"),
            tool,
            "/tmp/toolpack/test",
        )
    }

    #[test]
    fn test_context_copies_tool_id() {
        let ctx = context();
        assert_eq!(ctx.tool_id.as_str(), "contact-form");
        assert_eq!(ctx.path("manifest.json"), PathBuf::from("/tmp/toolpack/test/manifest.json"));
    }

    #[test]
    fn test_package_metadata_accessors() {
        let mut ctx = context();
        assert!(ctx.package_path().is_none());

        ctx.set_metadata(PACKAGE_PATH_KEY, "/tmp/pkg.json");
        ctx.set_metadata(PACKAGE_SIZE_KEY, 2048u64);
        ctx.set_metadata(PACKAGE_CHECKSUM_KEY, "abc");

        assert_eq!(ctx.package_path().as_deref(), Some("/tmp/pkg.json"));
        assert_eq!(ctx.package_size_bytes(), Some(2048));
        assert_eq!(ctx.package_checksum(), Some("abc"));

        ctx.remove_metadata(PACKAGE_PATH_KEY);
        assert!(ctx.package_path().is_none());
    }

    #[test]
    fn test_working_dir_for_is_job_scoped() {
        let job_id = JobId::generate();
        let dir = ExportContext::working_dir_for(Path::new("/scratch"), &job_id);
        assert_eq!(dir, PathBuf::from(format!("/scratch/{job_id}")));
    }
}
