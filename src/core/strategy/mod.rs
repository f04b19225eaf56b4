//! Export strategies
//!
//! A strategy turns a tool of one family into an ordered list of
//! rollback-capable steps. The [`StrategyRegistry`] maps resolved tool types
//! to strategies and is handed to the orchestrator explicitly.

pub mod families;
pub mod registry;
pub mod selector;
pub mod step;
pub mod steps;

pub use families::{FormStrategy, ThemeStrategy, WorkflowStrategy};
pub use registry::{ExportStrategy, StrategyRegistry};
pub use selector::{has_explicit_tool_type, resolve_tool_type, ToolType};
pub use step::ExportStep;
