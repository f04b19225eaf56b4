//! Reusable file-based export steps
//!
//! The built-in strategies compose their step lists from these building
//! blocks. All file content is rendered when the step is constructed, so a
//! step list is fully determined by the tool snapshot.

use crate::core::export::context::{
    ExportContext, PACKAGE_CHECKSUM_KEY, PACKAGE_PATH_KEY, PACKAGE_SIZE_KEY,
};
use crate::core::strategy::step::ExportStep;
use crate::domain::context::ResultExt;
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;

/// Directory inside the working directory where package files are staged
pub const STAGING_DIR: &str = "staging";

/// Bundle format identifier written into every package
pub const BUNDLE_FORMAT: &str = "toolpack-bundle/1";

async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Creates the staging directory
#[derive(Debug, Clone, Default)]
pub struct PrepareWorkspaceStep;

#[async_trait]
impl ExportStep for PrepareWorkspaceStep {
    fn name(&self) -> &str {
        "prepare-workspace"
    }

    fn description(&self) -> &str {
        "Preparing staging directory"
    }

    async fn execute(&self, ctx: &mut ExportContext) -> Result<()> {
        let staging = ctx.path(STAGING_DIR);
        tokio::fs::create_dir_all(&staging)
            .await
            .with_context(|| format!("Failed to create staging directory {}", staging.display()))
    }

    async fn rollback(&self, ctx: &mut ExportContext) -> Result<()> {
        match tokio::fs::remove_dir_all(ctx.path(STAGING_DIR)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes one pre-rendered file into the staging directory
#[derive(Debug, Clone)]
pub struct WriteFileStep {
    name: String,
    description: String,
    file_name: String,
    contents: Vec<u8>,
}

impl WriteFileStep {
    /// Step writing pretty-printed JSON
    pub fn json(name: impl Into<String>, file_name: impl Into<String>, value: &Value) -> Result<Self> {
        let file_name = file_name.into();
        let contents = serde_json::to_vec_pretty(value)?;
        Ok(Self {
            name: name.into(),
            description: format!("Writing {file_name}"),
            file_name,
            contents,
        })
    }

    /// Step writing plain text
    pub fn text(name: impl Into<String>, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            name: name.into(),
            description: format!("Writing {file_name}"),
            file_name,
            contents: text.into().into_bytes(),
        }
    }

    /// Name of the staged file
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[async_trait]
impl ExportStep for WriteFileStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn retryable(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ExportContext) -> Result<()> {
        let path = ctx.path(STAGING_DIR).join(&self.file_name);
        tokio::fs::write(&path, &self.contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn rollback(&self, ctx: &mut ExportContext) -> Result<()> {
        remove_file_if_exists(&ctx.path(STAGING_DIR).join(&self.file_name)).await
    }
}

/// Bundles the staged files into a single package file
///
/// Records the package path, size and SHA-256 checksum in the context.
#[derive(Debug, Clone)]
pub struct BuildPackageStep {
    package_file: String,
    tool_type: String,
    files: Vec<String>,
}

impl BuildPackageStep {
    /// Package the given staged files into `package_file`
    pub fn new(package_file: impl Into<String>, tool_type: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            package_file: package_file.into(),
            tool_type: tool_type.into(),
            files,
        }
    }
}

#[async_trait]
impl ExportStep for BuildPackageStep {
    fn name(&self) -> &str {
        "build-package"
    }

    fn description(&self) -> &str {
        "Building deployable package"
    }

    fn retryable(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ExportContext) -> Result<()> {
        let staging = ctx.path(STAGING_DIR);
        let mut files = Map::new();
        for file in &self.files {
            let path = staging.join(file);
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Missing staged file {}", path.display()))?;
            files.insert(file.clone(), Value::String(contents));
        }

        let bundle = json!({
            "format": BUNDLE_FORMAT,
            "tool_id": ctx.tool_id.as_str(),
            "tool_name": ctx.tool.name,
            "tool_type": self.tool_type,
            "job_id": ctx.job_id.to_string(),
            "files": files,
        });
        let bytes = serde_json::to_vec_pretty(&bundle)?;
        let checksum = format!("{:x}", Sha256::digest(&bytes));

        let package_path = ctx.path(&self.package_file);
        tokio::fs::write(&package_path, &bytes)
            .await
            .with_context(|| format!("Failed to write package {}", package_path.display()))?;

        tracing::debug!(
            job_id = %ctx.job_id,
            package = %package_path.display(),
            size_bytes = bytes.len(),
            checksum = %checksum,
            "Package written"
        );

        ctx.set_metadata(PACKAGE_PATH_KEY, package_path.to_string_lossy().to_string());
        ctx.set_metadata(PACKAGE_SIZE_KEY, bytes.len() as u64);
        ctx.set_metadata(PACKAGE_CHECKSUM_KEY, checksum);
        Ok(())
    }

    async fn rollback(&self, ctx: &mut ExportContext) -> Result<()> {
        ctx.remove_metadata(PACKAGE_PATH_KEY);
        ctx.remove_metadata(PACKAGE_SIZE_KEY);
        ctx.remove_metadata(PACKAGE_CHECKSUM_KEY);
        remove_file_if_exists(&ctx.path(&self.package_file)).await
    }
}

/// Manifest describing the package contents
pub fn manifest(tool_id: &str, tool_name: &str, tool_type: &str, files: &[String]) -> Value {
    json!({
        "format": BUNDLE_FORMAT,
        "tool": {
            "id": tool_id,
            "name": tool_name,
            "type": tool_type,
        },
        "files": files,
        "generator": format!("toolpack {}", env!("CARGO_PKG_VERSION")),
    })
}

/// Standard step list: prepare, definition files, manifest, package
pub fn standard_steps(
    tool_id: &str,
    tool_name: &str,
    tool_type: &str,
    package_file: String,
    definition_files: Vec<WriteFileStep>,
) -> Result<Vec<Box<dyn ExportStep>>> {
    let mut files: Vec<String> = definition_files
        .iter()
        .map(|step| step.file_name().to_string())
        .collect();
    let manifest_step = WriteFileStep::json(
        "write-manifest",
        "manifest.json",
        &manifest(tool_id, tool_name, tool_type, &files),
    )?;
    files.push(manifest_step.file_name().to_string());

    let mut steps: Vec<Box<dyn ExportStep>> = vec![Box::new(PrepareWorkspaceStep)];
    for step in definition_files {
        steps.push(Box::new(step));
    }
    steps.push(Box::new(manifest_step));
    steps.push(Box::new(BuildPackageStep::new(package_file, tool_type, files)));
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{JobId, UserId};
    use crate::domain::tool::ToolRecord;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> ExportContext {
        let tool = Arc::new(ToolRecord::new("contact-form", "Contact", json!({})));
        ExportContext::new(JobId::generate(), UserId::new("u"), tool, dir.path())
    }

    #[tokio::test]
    async fn test_standard_steps_produce_package() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);

        let steps = standard_steps(
            "contact-form",
            "Contact",
            "form",
            "contact-form.bundle.json".to_string(),
            vec![WriteFileStep::json("write-form", "form.json", &json!({"fields": []})).unwrap()],
        )
        .unwrap();

        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["prepare-workspace", "write-form", "write-manifest", "build-package"]
        );

        for step in &steps {
            step.execute(&mut ctx).await.unwrap();
        }

        let package_path = ctx.package_path().unwrap();
        let bytes = std::fs::read(&package_path).unwrap();
        assert_eq!(ctx.package_size_bytes(), Some(bytes.len() as u64));
        assert_eq!(
            ctx.package_checksum().unwrap(),
            format!("{:x}", Sha256::digest(&bytes))
        );

        let bundle: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(bundle["format"], BUNDLE_FORMAT);
        assert!(bundle["files"]["form.json"].is_string());
        assert!(bundle["files"]["manifest.json"].is_string());
    }

    #[tokio::test]
    async fn test_rollback_removes_created_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);

        let prepare = PrepareWorkspaceStep;
        let write = WriteFileStep::text("write-css", "theme.css", ":root {}");
        let package = BuildPackageStep::new("out.json", "theme", vec!["theme.css".to_string()]);

        prepare.execute(&mut ctx).await.unwrap();
        write.execute(&mut ctx).await.unwrap();
        package.execute(&mut ctx).await.unwrap();

        package.rollback(&mut ctx).await.unwrap();
        assert!(!dir.path().join("out.json").exists());
        assert!(ctx.package_path().is_none());

        write.rollback(&mut ctx).await.unwrap();
        assert!(!dir.path().join(STAGING_DIR).join("theme.css").exists());

        prepare.rollback(&mut ctx).await.unwrap();
        assert!(!dir.path().join(STAGING_DIR).exists());
    }

    #[tokio::test]
    async fn test_rollback_is_tolerant_of_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        WriteFileStep::text("w", "never-written.txt", "")
            .rollback(&mut ctx)
            .await
            .unwrap();
        PrepareWorkspaceStep.rollback(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_build_package_fails_without_staged_files() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let err = BuildPackageStep::new("out.json", "form", vec!["form.json".to_string()])
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing staged file"));
    }
}
