//! Theme tool export

use crate::core::strategy::registry::ExportStrategy;
use crate::core::strategy::selector::ToolType;
use crate::core::strategy::step::ExportStep;
use crate::core::strategy::steps::{standard_steps, WriteFileStep};
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use serde_json::{json, Map, Value};

/// Exports visual themes
///
/// A theme is a `palette` object of named colors. The package carries the
/// palette as JSON and as CSS custom properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeStrategy;

impl ThemeStrategy {
    fn palette(tool: &ToolRecord) -> Result<&Map<String, Value>> {
        let palette = tool
            .config_value("palette")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ToolpackError::Validation(format!(
                    "theme tool '{}' must define a 'palette' object",
                    tool.id
                ))
            })?;
        if palette.is_empty() {
            return Err(ToolpackError::Validation(format!(
                "theme tool '{}' has an empty palette",
                tool.id
            )));
        }
        Ok(palette)
    }

    fn stylesheet(palette: &Map<String, Value>) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in palette {
            if let Some(value) = value.as_str() {
                css.push_str(&format!("  --{name}: {value};\n"));
            }
        }
        css.push_str("}\n");
        css
    }
}

impl ExportStrategy for ThemeStrategy {
    fn tool_type(&self) -> ToolType {
        ToolType::Theme
    }

    fn validate_tool_data(&self, tool: &ToolRecord) -> Result<()> {
        for (name, value) in Self::palette(tool)? {
            if !value.is_string() {
                return Err(ToolpackError::Validation(format!(
                    "theme tool '{}': palette entry '{}' must be a string",
                    tool.id, name
                )));
            }
        }
        Ok(())
    }

    fn steps(&self, tool: &ToolRecord) -> Result<Vec<Box<dyn ExportStep>>> {
        let palette = Self::palette(tool)?;
        let definition = json!({
            "id": tool.id.as_str(),
            "name": tool.name,
            "palette": palette,
        });

        standard_steps(
            tool.id.as_str(),
            &tool.name,
            ToolType::Theme.as_str(),
            format!("{}.bundle.json", tool.slug()),
            vec![
                WriteFileStep::json("write-theme-definition", "theme.json", &definition)?,
                WriteFileStep::text("write-theme-stylesheet", "theme.css", Self::stylesheet(palette)),
            ],
        )
    }
}
