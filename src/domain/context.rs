//! Error context extension trait
//!
//! Provides `.context()` / `.with_context()` for `Result<T, ToolpackError>`,
//! similar to `anyhow::Context`, so library code keeps the domain error type
//! while still reporting where a failure happened.
//!
//! # Examples
//!
//! ```rust
//! use toolpack::domain::Result;
//! use toolpack::domain::context::ResultExt;
//!
//! fn read_manifest(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_context(|| format!("Failed to read manifest: {}", path))
//! }
//! ```

use crate::domain::errors::ToolpackError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (evaluated only on error)
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

/// Implementation for any error convertible into `ToolpackError`
///
/// The wrapped error keeps its original message; the context is prefixed.
impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ToolpackError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| {
            let base_error = e.into();
            ToolpackError::Other(format!("{context}: {base_error}"))
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let base_error = e.into();
            let context = f();
            ToolpackError::Other(format!("{context}: {base_error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::StepError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_with_toolpack_error() {
        let result: Result<()> = Err(ToolpackError::Configuration("Invalid config".to_string()));
        let err_msg = result
            .context("Failed to load configuration")
            .unwrap_err()
            .to_string();

        assert!(err_msg.contains("Failed to load configuration"));
        assert!(err_msg.contains("Invalid config"));
    }

    #[test]
    fn test_with_context_lazy_evaluation() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let result: Result<i32> = Ok(42);
        let with_context = result.with_context(|| {
            called_clone.store(true, Ordering::SeqCst);
            "Expensive context"
        });

        assert!(with_context.is_ok());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_context_with_step_error() {
        let result: Result<()> = Err(StepError::failed("write-manifest", "disk full").into());
        let err_msg = result
            .context("Export job 42 aborted")
            .unwrap_err()
            .to_string();

        assert!(err_msg.contains("Export job 42 aborted"));
        assert!(err_msg.contains("disk full"));
    }

    #[test]
    fn test_context_chaining() {
        let result: Result<()> = Err(ToolpackError::Database("Connection failed".to_string()));
        let err_msg = result
            .context("Failed to execute query")
            .context("Failed to load export job")
            .unwrap_err()
            .to_string();

        assert!(err_msg.contains("Failed to load export job"));
        assert!(err_msg.contains("Failed to execute query"));
        assert!(err_msg.contains("Connection failed"));
    }

    #[test]
    fn test_io_error_with_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let result: std::result::Result<(), std::io::Error> = Err(io_error);
        let err_msg = result
            .context("Failed to read configuration file 'toolpack.toml'")
            .unwrap_err()
            .to_string();

        assert!(err_msg.contains("Failed to read configuration file"));
        assert!(err_msg.contains("File not found"));
    }
}
