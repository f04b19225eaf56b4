//! Tool registry record
//!
//! A tool is owned by the external tool CRUD service. The export subsystem
//! only ever reads it, and takes one immutable snapshot per execution.

use crate::domain::ids::{ToolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored tool record as returned by the tool registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Tool identifier
    pub id: ToolId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// User who registered the tool, if known
    #[serde(default)]
    pub owner_id: Option<UserId>,

    /// Stored tool configuration (family specific, may carry `toolType`)
    #[serde(default)]
    pub configuration: Value,

    /// When the tool was registered
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// When the tool was last modified
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ToolRecord {
    /// Creates a tool record with the given configuration
    pub fn new(id: impl Into<ToolId>, name: impl Into<String>, configuration: Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: None,
            configuration,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the owning user
    pub fn with_owner(mut self, owner_id: impl Into<UserId>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Looks up a top-level configuration entry
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    /// Looks up a top-level configuration entry holding a string
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_value(key).and_then(Value::as_str)
    }

    /// Filesystem-safe slug derived from the tool id
    pub fn slug(&self) -> String {
        let slug: String = self
            .id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() {
            "tool".to_string()
        } else {
            slug
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_lookup() {
        let tool = ToolRecord::new(
            "signup",
            "Signup",
            json!({"toolType": "form", "fields": []}),
        );
        assert_eq!(tool.config_str("toolType"), Some("form"));
        assert!(tool.config_value("fields").is_some());
        assert!(tool.config_str("missing").is_none());
    }

    #[test]
    fn test_slug_sanitizes_identifier() {
        let tool = ToolRecord::new("Team/Onboarding Workflow", "", Value::Null);
        assert_eq!(tool.slug(), "team-onboarding-workflow");

        let tool = ToolRecord::new("///", "", Value::Null);
        assert_eq!(tool.slug(), "tool");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let tool: ToolRecord =
            serde_json::from_value(json!({"id": "dark-theme", "configuration": {"palette": {}}}))
                .unwrap();
        assert_eq!(tool.id.as_str(), "dark-theme");
        assert!(tool.name.is_empty());
        assert!(tool.owner_id.is_none());
    }
}
