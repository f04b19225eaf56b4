//! Domain models and types for Toolpack.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`ToolId`], [`UserId`])
//! - **Records** ([`ExportJob`], [`ToolRecord`]) and partial updates ([`JobUpdate`])
//! - **Error types** ([`ToolpackError`], [`StepError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible library operations return [`Result<T, ToolpackError>`]:
//!
//! ```rust
//! use toolpack::domain::{Result, ToolpackError};
//!
//! fn example(tool_id: &str) -> Result<()> {
//!     if tool_id.is_empty() {
//!         return Err(ToolpackError::Validation("tool id is empty".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;
pub mod tool;

// Re-export commonly used types for convenience
pub use errors::{StepError, ToolpackError};
pub use ids::{JobId, ToolId, UserId};
pub use job::{progress_percentage, ExportJob, JobStatus, JobUpdate, NewExportJob};
pub use result::Result;
pub use tool::ToolRecord;
