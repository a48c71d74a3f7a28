//! JSON action dispatch over [`RulesHub`] for agent-facing protocol layers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::RuleError;
use crate::hub::RulesHub;

pub const TOOL_NAME: &str = "ruleshub";
pub const ACTION_GET_CONTENT: &str = "GetRuleContentById";
pub const ACTION_GET_ALL_METADATA: &str = "GetAllRulesMetadata";

/// Advertised shape of the rules-hub action endpoint: the name agents call
/// it by and a JSON Schema for the `action` / `ruleId` input object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions = self.input_schema["properties"]["action"]["enum"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        write!(f, "{} [{}]: {}", self.name, actions, self.description)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Agent tool exposing `GetAllRulesMetadata` and `GetRuleContentById`.
#[derive(Clone)]
pub struct RulesHubTool {
    hub: Arc<RulesHub>,
}

impl RulesHubTool {
    pub fn new(hub: Arc<RulesHub>) -> Self {
        Self { hub }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "A tool for managing and providing contextual rules for AI agents"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "The action to perform: 'GetRuleContentById' or 'GetAllRulesMetadata'",
                        "enum": [ACTION_GET_CONTENT, ACTION_GET_ALL_METADATA]
                    },
                    "ruleId": {
                        "type": "string",
                        "description": "The ID of the rule to retrieve (required for GetRuleContentById)"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    /// Run one action and return its JSON result.
    pub async fn execute(&self, input: Value, cancel: &CancellationToken) -> Result<Value, ToolError> {
        let action = input
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("action parameter is required".to_string()))?;

        match action {
            ACTION_GET_ALL_METADATA => {
                let rules = self.hub.get_all_metadata(cancel).await?;
                Ok(json!({
                    "count": rules.len(),
                    "rules": rules,
                }))
            }
            ACTION_GET_CONTENT => {
                let rule_id = input
                    .get("ruleId")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        ToolError::InvalidInput(format!(
                            "ruleId parameter is required for {}",
                            ACTION_GET_CONTENT
                        ))
                    })?;
                let rule = self.hub.get_content_by_id(rule_id, cancel).await?;
                Ok(serde_json::to_value(rule)?)
            }
            other => Err(ToolError::InvalidInput(format!("unknown action: {}", other))),
        }
    }
}
