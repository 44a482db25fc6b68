//! Tool trait — the abstraction specialist agents call into.
//!
//! Tools are how an agent acts on the project: run a shell command, write a
//! file. Every tool in this workspace puts a guardrail between the agent and
//! the collaborator that actually touches the system.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content, already sanitized
    pub output: String,

    /// Optional structured data (confirmation flags, exit codes, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A result with no structured data.
    pub fn text(success: bool, output: impl Into<String>) -> Self {
        Self {
            success,
            output: output.into(),
            data: None,
        }
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Read a boolean flag out of the structured data.
    pub fn flag(&self, key: &str) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// A tool definition as advertised to a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "file_write").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
