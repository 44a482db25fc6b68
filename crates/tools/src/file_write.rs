//! Guarded file write tool — content must pass the edit guardrail before the
//! writer collaborator ever sees it.

use agentguard_config::GuardrailConfig;
use agentguard_core::error::ToolError;
use agentguard_core::tool::{Tool, ToolResult};
use agentguard_core::{FileWriter, OperationKind};
use agentguard_security::{AuditEvent, AuditLogger, AuditOutcome, EditGuardrail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct GuardedFileWriteTool {
    writer: Arc<dyn FileWriter>,
    config: Arc<GuardrailConfig>,
    audit: Option<Arc<AuditLogger>>,
}

impl GuardedFileWriteTool {
    pub fn new(writer: Arc<dyn FileWriter>, config: Arc<GuardrailConfig>) -> Self {
        Self {
            writer,
            config,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }
}

#[async_trait]
impl Tool for GuardedFileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file. Overwrites must mark the replaced code \
         with BEGIN REGION / END REGION comments."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                },
                "operation": {
                    "type": "string",
                    "enum": ["edit", "overwrite"],
                    "description":
                        "Whether this changes part of the file or replaces it (default: edit)"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let operation = match arguments["operation"].as_str() {
            Some(op) => op.parse::<OperationKind>().map_err(ToolError::InvalidArguments)?,
            None => OperationKind::Edit,
        };

        let verdict = EditGuardrail::new(&self.config.thresholds).validate(content, operation);
        if !verdict.is_valid {
            let error = verdict.error.unwrap_or_default();
            if let Some(audit) = &self.audit {
                audit.log(
                    AuditEvent::EditRejected { path: path.into() },
                    self.name(),
                    path,
                    AuditOutcome::Denied,
                    Some(error.clone()),
                );
            }
            return Ok(ToolResult::text(false, format!("Edit rejected for {path}: {error}"))
                .with_data(serde_json::json!({
                    "is_valid": false,
                    "error": error,
                })));
        }

        debug!(path = %path, operation = %operation, "Writing validated content");
        self.writer.write(path, content).await?;

        Ok(ToolResult::text(
            true,
            format!(
                "Wrote {} characters to {path} ({operation})",
                content.chars().count()
            ),
        )
        .with_data(serde_json::json!({
            "is_valid": true,
            "operation": operation,
        })))
    }
}
