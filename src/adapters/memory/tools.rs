//! In-memory tool registry
//!
//! Used by tests and by the `memory` database target, where tool records are
//! loaded from a JSON file (an array of tool records).

use crate::adapters::database::traits::ToolRegistryRepository;
use crate::domain::ids::ToolId;
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Tool registry held in process memory
#[derive(Default)]
pub struct InMemoryToolRegistry {
    tools: RwLock<HashMap<ToolId, ToolRecord>>,
}

impl InMemoryToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with tools
    pub fn with_tools(tools: impl IntoIterator<Item = ToolRecord>) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.id.clone(), tool))
            .collect();
        Self {
            tools: RwLock::new(tools),
        }
    }

    /// Load tool records from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON array of
    /// tool records, or contains duplicate tool ids.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ToolpackError::Configuration(format!(
                "Failed to read tools file {}: {}",
                path.display(),
                e
            ))
        })?;

        let records: Vec<ToolRecord> = serde_json::from_str(&contents).map_err(|e| {
            ToolpackError::Configuration(format!(
                "Failed to parse tools file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut tools = HashMap::with_capacity(records.len());
        for record in records {
            if tools.contains_key(&record.id) {
                return Err(ToolpackError::Configuration(format!(
                    "Duplicate tool id '{}' in {}",
                    record.id,
                    path.display()
                )));
            }
            tools.insert(record.id.clone(), record);
        }

        tracing::info!(count = tools.len(), path = %path.display(), "Loaded tool registry");

        Ok(Self {
            tools: RwLock::new(tools),
        })
    }

    /// Add or replace a tool
    pub async fn upsert(&self, tool: ToolRecord) {
        self.tools.write().await.insert(tool.id.clone(), tool);
    }
}

#[async_trait]
impl ToolRegistryRepository for InMemoryToolRegistry {
    async fn find_by_id(&self, tool_id: &ToolId) -> Result<Option<ToolRecord>> {
        Ok(self.tools.read().await.get(tool_id).cloned())
    }
}
