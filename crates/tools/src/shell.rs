//! Guarded shell tool — the only path from an agent to the command executor.
//!
//! Every call goes classifier → confirmation gate → executor → sanitizer.
//! Blocked and pending commands never reach the executor.

use agentguard_config::GuardrailConfig;
use agentguard_core::error::{GuardrailError, ToolError};
use agentguard_core::tool::{Tool, ToolResult};
use agentguard_core::{CommandExecutor, CommandRunResult};
use agentguard_security::{
    Approval, AuditEvent, AuditLogger, AuditOutcome, CommandRequest, ConfirmationGate, GateOutcome,
    OutputSanitizer, wrap_command_output,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct GuardedShellTool {
    executor: Arc<dyn CommandExecutor>,
    config: Arc<GuardrailConfig>,
    gate: ConfirmationGate,
    audit: Option<Arc<AuditLogger>>,
}

impl GuardedShellTool {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: Arc<GuardrailConfig>) -> Self {
        let gate = ConfirmationGate::from_config(&config);
        Self {
            executor,
            config,
            gate,
            audit: None,
        }
    }

    /// Record every decision to the given audit logger.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    fn record(&self, event: AuditEvent, command: &str, outcome: AuditOutcome) {
        if let Some(audit) = &self.audit {
            audit.log(event, self.name(), command, outcome, None);
        }
    }

    fn parse_approval(arguments: &serde_json::Value) -> Result<Option<Approval>, ToolError> {
        match arguments.get("approval") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ToolError::InvalidArguments(format!("Invalid 'approval': {e}"))),
        }
    }

    /// Spam is judged per stream; the size ceiling applies to both together.
    fn screen_streams(
        &self,
        sanitizer: &OutputSanitizer<'_>,
        run: &CommandRunResult,
    ) -> Result<(), GuardrailError> {
        for stream in [&run.stdout, &run.stderr] {
            if let Some(detected) = sanitizer.detect_spam(stream) {
                return Err(GuardrailError::SpamDetected {
                    reason: detected.to_string(),
                });
            }
        }

        let observed = run.stdout.chars().count() + run.stderr.chars().count();
        let limit = self.config.thresholds.output_hard_ceiling;
        if observed > limit {
            return Err(GuardrailError::OversizeContent {
                what: "Output".into(),
                limit,
                observed,
            });
        }
        Ok(())
    }

    fn format_run(&self, run: &CommandRunResult, approved: bool) -> ToolResult {
        let sanitizer = OutputSanitizer::new(&self.config.thresholds);
        let command = run.command.join(" ");

        if let Err(e) = self.screen_streams(&sanitizer, run) {
            warn!(command = %command, error = %e, "Command output rejected");
            self.record(
                AuditEvent::OutputRejected { reason: e.to_string() },
                &command,
                AuditOutcome::Denied,
            );
            return ToolResult::text(
                false,
                format!("OUTPUT REJECTED: {e}\n\nDo you want a digest instead?"),
            )
            .with_data(serde_json::json!({
                "rejected": true,
                "returncode": run.exit_code,
                "duration_seconds": run.duration.as_secs_f64(),
                "digest": sanitizer.digest(&joined_streams(run)).to_string(),
            }));
        }

        let body = wrap_command_output(
            &sanitizer.sanitize_terminal_output(&run.stdout),
            &sanitizer.sanitize_terminal_output(&run.stderr),
        );
        let output = format!(
            "Command: {command}\nReturn code: {} in {:.2}s\n{body}",
            run.exit_code,
            run.duration.as_secs_f64()
        );

        ToolResult::text(run.success(), output).with_data(serde_json::json!({
            "returncode": run.exit_code,
            "duration_seconds": run.duration.as_secs_f64(),
            "approved": approved,
        }))
    }
}

fn joined_streams(run: &CommandRunResult) -> String {
    match (run.stdout.is_empty(), run.stderr.is_empty()) {
        (_, true) => run.stdout.clone(),
        (true, false) => run.stderr.clone(),
        (false, false) => format!("{}\n{}", run.stdout, run.stderr),
    }
}

#[async_trait]
impl Tool for GuardedShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a command in the project. Risky commands need an explicit approval; \
         destructive or chained commands are refused."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to run. Append 'confirm: yes' to approve \
                                    a command that asked for confirmation."
                },
                "approval": {
                    "type": "object",
                    "description": "Structured approval for exactly this command",
                    "properties": {
                        "approved": { "type": "boolean" },
                        "command_sha256": { "type": "string" }
                    },
                    "required": ["approved", "command_sha256"]
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;
        let approval = Self::parse_approval(&arguments)?;

        let mut request = CommandRequest::new(command);
        if let Some(approval) = approval {
            request = request.with_approval(approval);
        }

        let outcome = self
            .gate
            .evaluate(&request)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        match outcome {
            GateOutcome::Blocked { assessment, command } => {
                self.record(
                    AuditEvent::CommandBlocked {
                        reason: assessment.reason.clone(),
                    },
                    &command,
                    AuditOutcome::Denied,
                );
                let error = GuardrailError::PolicyViolation {
                    reason: assessment.reason.clone(),
                };
                Ok(ToolResult::text(false, error.to_string()).with_data(serde_json::json!({
                    "blocked": true,
                    "status": assessment.status,
                    "reason": assessment.reason,
                    "command": command,
                })))
            }
            GateOutcome::ConfirmationRequired { prompt } => {
                self.record(
                    AuditEvent::ConfirmationRequested {
                        reason: prompt.reason.clone(),
                    },
                    &prompt.command,
                    AuditOutcome::Pending,
                );
                Ok(ToolResult::text(false, prompt.message()).with_data(serde_json::json!({
                    "confirmation_required": true,
                    "confirmation_reason": prompt.reason,
                    "command": prompt.command,
                    "resubmit": prompt.resubmit,
                })))
            }
            GateOutcome::Proceed { argv, approved, .. } => {
                let event = if approved {
                    AuditEvent::CommandApproved
                } else {
                    AuditEvent::CommandAllowed
                };
                self.record(event, command, AuditOutcome::Success);
                debug!(command = %command, approved, "Executing command");

                let run = self.executor.execute(&argv).await?;
                Ok(self.format_run(&run, approved))
            }
        }
    }
}
