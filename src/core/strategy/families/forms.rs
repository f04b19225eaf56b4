//! Form tool export

use crate::core::strategy::registry::ExportStrategy;
use crate::core::strategy::selector::ToolType;
use crate::core::strategy::step::ExportStep;
use crate::core::strategy::steps::{standard_steps, WriteFileStep};
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use serde_json::{json, Value};

/// Exports form tools
///
/// Expects `configuration.fields` to be a non-empty array of objects, each
/// carrying a string `name`. Field names must be unique.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormStrategy;

impl FormStrategy {
    fn fields(tool: &ToolRecord) -> Result<&Vec<Value>> {
        let fields = tool
            .config_value("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ToolpackError::Validation(format!(
                    "form tool '{}' must define a 'fields' array",
                    tool.id
                ))
            })?;

        if fields.is_empty() {
            return Err(ToolpackError::Validation(format!(
                "form tool '{}' has no fields",
                tool.id
            )));
        }
        Ok(fields)
    }
}

impl ExportStrategy for FormStrategy {
    fn tool_type(&self) -> ToolType {
        ToolType::Form
    }

    fn validate_tool_data(&self, tool: &ToolRecord) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (index, field) in Self::fields(tool)?.iter().enumerate() {
            let name = field
                .as_object()
                .and_then(|f| f.get("name"))
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    ToolpackError::Validation(format!(
                        "form tool '{}': field #{} must be an object with a non-empty 'name'",
                        tool.id,
                        index + 1
                    ))
                })?;

            if !seen.insert(name) {
                return Err(ToolpackError::Validation(format!(
                    "form tool '{}': duplicate field name '{}'",
                    tool.id, name
                )));
            }
        }
        Ok(())
    }

    fn steps(&self, tool: &ToolRecord) -> Result<Vec<Box<dyn ExportStep>>> {
        let fields = Self::fields(tool)?;
        let definition = json!({
            "id": tool.id.as_str(),
            "name": tool.name,
            "fields": fields,
            "submit": tool.config_value("submit").cloned().unwrap_or(Value::Null),
        });

        standard_steps(
            tool.id.as_str(),
            &tool.name,
            ToolType::Form.as_str(),
            format!("{}.bundle.json", tool.slug()),
            vec![WriteFileStep::json("write-form-definition", "form.json", &definition)?],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tool(configuration: Value) -> ToolRecord {
        ToolRecord::new("contact-form", "Contact", configuration)
    }

    #[test]
    fn test_valid_form() {
        let tool = tool(json!({"fields": [{"name": "email", "type": "email"}, {"name": "message"}]}));
        assert!(FormStrategy.validate_tool_data(&tool).is_ok());
    }

    #[test_case(json!({}) ; "missing fields")]
    #[test_case(json!({"fields": []}) ; "empty fields")]
    #[test_case(json!({"fields": "email"}) ; "fields not an array")]
    #[test_case(json!({"fields": [{"type": "text"}]}) ; "field without name")]
    #[test_case(json!({"fields": ["email"]}) ; "field not an object")]
    #[test_case(json!({"fields": [{"name": "a"}, {"name": "a"}]}) ; "duplicate names")]
    fn test_invalid_form(configuration: Value) {
        let err = FormStrategy.validate_tool_data(&tool(configuration)).unwrap_err();
        assert!(matches!(err, ToolpackError::Validation(_)));
    }

    #[test]
    fn test_steps_are_deterministic() {
        let tool = tool(json!({"fields": [{"name": "email"}]}));
        let first: Vec<String> = FormStrategy
            .steps(&tool)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        let second: Vec<String> = FormStrategy
            .steps(&tool)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "prepare-workspace",
                "write-form-definition",
                "write-manifest",
                "build-package"
            ]
        );
    }
}
