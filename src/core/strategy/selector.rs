//! Tool type resolution
//!
//! Maps a tool record to its family discriminator. Resolution is pure: an
//! explicit `toolType` stored in the tool configuration wins, otherwise the
//! tool id is matched against the family keywords.

use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration keys checked for an explicit tool type
const TOOL_TYPE_KEYS: [&str; 2] = ["toolType", "tool_type"];

/// Tool family discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Form builder tools
    Form,
    /// Workflow / state machine tools
    Workflow,
    /// Visual theme tools
    Theme,
}

impl ToolType {
    /// All known tool types, in identifier-matching priority order
    pub const ALL: [ToolType; 3] = [ToolType::Form, ToolType::Workflow, ToolType::Theme];

    /// Lowercase family name
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::Form => "form",
            ToolType::Workflow => "workflow",
            ToolType::Theme => "theme",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" | "forms" => Ok(ToolType::Form),
            "workflow" | "workflows" => Ok(ToolType::Workflow),
            "theme" | "themes" => Ok(ToolType::Theme),
            other => Err(format!("Unknown tool type '{other}'")),
        }
    }
}

/// Determine the family of a tool
///
/// A stored `toolType` is authoritative. Only tools without one have their
/// family inferred from the tool id.
///
/// # Errors
///
/// Returns `UnsupportedToolType` when the stored `toolType` names no known
/// family, or when there is none and the tool id matches no family. This
/// error is fatal and not retryable.
pub fn resolve_tool_type(tool: &ToolRecord) -> Result<ToolType> {
    if let Some(declared) = TOOL_TYPE_KEYS.iter().find_map(|key| tool.config_str(key)) {
        return declared.parse().map_err(|_| {
            ToolpackError::UnsupportedToolType(format!(
                "tool '{}' declares unknown toolType '{}'",
                tool.id, declared
            ))
        });
    }

    let identifier = tool.id.as_str().to_ascii_lowercase();
    ToolType::ALL
        .iter()
        .copied()
        .find(|tool_type| identifier.contains(tool_type.as_str()))
        .ok_or_else(|| {
            ToolpackError::UnsupportedToolType(format!(
                "cannot determine tool type for tool '{}'",
                tool.id
            ))
        })
}

/// Whether the tool stores an explicit tool type (recognized or not)
pub fn has_explicit_tool_type(tool: &ToolRecord) -> bool {
    TOOL_TYPE_KEYS.iter().any(|key| tool.config_str(key).is_some())
}
