//! Export strategies and the strategy registry
//!
//! The registry is an explicit object handed to the orchestrator, keyed by
//! [`ToolType`]. Tests build registries containing their own strategies.

use crate::core::strategy::families::{FormStrategy, ThemeStrategy, WorkflowStrategy};
use crate::core::strategy::selector::{resolve_tool_type, ToolType};
use crate::core::strategy::step::ExportStep;
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool-family specific producer of export steps
///
/// Implementations must stay in memory (no I/O) and be deterministic for a
/// given tool snapshot: crash recovery rebuilds the step list from the tool
/// and matches it against the persisted completed-steps ledger by name.
pub trait ExportStrategy: Send + Sync {
    /// Family this strategy handles
    fn tool_type(&self) -> ToolType;

    /// Check the stored tool configuration is structurally valid
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error describing the first problem found.
    fn validate_tool_data(&self, tool: &ToolRecord) -> Result<()>;

    /// Ordered steps that export this tool
    fn steps(&self, tool: &ToolRecord) -> Result<Vec<Box<dyn ExportStep>>>;
}

/// Lookup from tool type to strategy
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ToolType, Arc<dyn ExportStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in form, workflow and theme strategies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FormStrategy));
        registry.register(Arc::new(WorkflowStrategy));
        registry.register(Arc::new(ThemeStrategy));
        registry
    }

    /// Register a strategy, replacing any previous one for the same type
    pub fn register(&mut self, strategy: Arc<dyn ExportStrategy>) -> &mut Self {
        self.strategies.insert(strategy.tool_type(), strategy);
        self
    }

    /// Strategy registered for a tool type
    pub fn get(&self, tool_type: ToolType) -> Option<Arc<dyn ExportStrategy>> {
        self.strategies.get(&tool_type).cloned()
    }

    /// Resolve the tool's type and return its strategy
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedToolType` if the type cannot be resolved or no
    /// strategy is registered for it.
    pub fn select(&self, tool: &ToolRecord) -> Result<Arc<dyn ExportStrategy>> {
        let tool_type = resolve_tool_type(tool)?;
        self.get(tool_type).ok_or_else(|| {
            ToolpackError::UnsupportedToolType(format!(
                "no export strategy registered for tool type '{tool_type}'"
            ))
        })
    }

    /// Registered tool types
    pub fn tool_types(&self) -> Vec<ToolType> {
        let mut types: Vec<ToolType> = self.strategies.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}
