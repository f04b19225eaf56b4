//! Workflow tool export

use crate::core::strategy::registry::ExportStrategy;
use crate::core::strategy::selector::ToolType;
use crate::core::strategy::step::ExportStep;
use crate::core::strategy::steps::{standard_steps, WriteFileStep};
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Exports workflow (state machine) tools
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowStrategy;

fn invalid(tool: &ToolRecord, message: impl std::fmt::Display) -> ToolpackError {
    ToolpackError::Validation(format!("workflow tool '{}': {}", tool.id, message))
}

impl WorkflowStrategy {
    fn states(tool: &ToolRecord) -> Result<Vec<&str>> {
        let states = tool
            .config_value("states")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(tool, "must define a 'states' array"))?;
        if states.is_empty() {
            return Err(invalid(tool, "has no states"));
        }

        states
            .iter()
            .map(|state| {
                state
                    .as_str()
                    .ok_or_else(|| invalid(tool, format!("state {state} is not a string")))
            })
            .collect()
    }

    fn transitions(tool: &ToolRecord) -> Result<&[Value]> {
        match tool.config_value("transitions") {
            None | Some(Value::Null) => Ok(&[][..]),
            Some(Value::Array(transitions)) => Ok(transitions.as_slice()),
            Some(_) => Err(invalid(tool, "'transitions' must be an array")),
        }
    }
}

impl ExportStrategy for WorkflowStrategy {
    fn tool_type(&self) -> ToolType {
        ToolType::Workflow
    }

    fn validate_tool_data(&self, tool: &ToolRecord) -> Result<()> {
        let states: HashSet<&str> = Self::states(tool)?.into_iter().collect();

        for (index, transition) in Self::transitions(tool)?.iter().enumerate() {
            for end in ["from", "to"] {
                let state = transition
                    .get(end)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        invalid(tool, format!("transition #{} is missing '{end}'", index + 1))
                    })?;
                if !states.contains(state) {
                    return Err(invalid(
                        tool,
                        format!("transition #{} references unknown state '{state}'", index + 1),
                    ));
                }
            }
        }
        Ok(())
    }

    fn steps(&self, tool: &ToolRecord) -> Result<Vec<Box<dyn ExportStep>>> {
        let states = Self::states(tool)?;
        let transitions = Self::transitions(tool)?;
        let initial = tool
            .config_str("initialState")
            .or_else(|| states.first().copied());

        let definition = json!({
            "id": tool.id.as_str(),
            "name": tool.name,
            "initial_state": initial,
            "states": states,
        });
        let transitions = json!({ "transitions": transitions });

        standard_steps(
            tool.id.as_str(),
            &tool.name,
            ToolType::Workflow.as_str(),
            format!("{}.bundle.json", tool.slug()),
            vec![
                WriteFileStep::json("write-workflow-definition", "workflow.json", &definition)?,
                WriteFileStep::json("write-workflow-transitions", "transitions.json", &transitions)?,
            ],
        )
    }
}
