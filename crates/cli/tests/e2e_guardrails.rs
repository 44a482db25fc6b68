//! End-to-end tests for the guardrail pipeline.
//!
//! These drive the guarded tools the way an agent would: raw tool-call
//! arguments in, sanitized tool results out, with mock collaborators standing
//! in for the process executor and the filesystem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentguard_config::GuardrailConfig;
use agentguard_core::error::ToolError;
use agentguard_core::tool::Tool;
use agentguard_core::{CommandExecutor, CommandRunResult, FileWriter};
use agentguard_security::{AuditLogger, AuditOutcome, RequestVeto};
use agentguard_tools::{GuardedFileWriteTool, GuardedShellTool};

// ── Mock collaborators ───────────────────────────────────────────────────

/// Executor that records argv and answers with scripted stdout.
struct RecordingExecutor {
    calls: Mutex<Vec<Vec<String>>>,
    stdout: String,
}

impl RecordingExecutor {
    fn new(stdout: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            stdout: stdout.to_string(),
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, argv: &[String]) -> Result<CommandRunResult, ToolError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        Ok(CommandRunResult {
            command: argv.to_vec(),
            exit_code: 0,
            stdout: self.stdout.clone(),
            stderr: String::new(),
            duration: Duration::from_millis(40),
        })
    }
}

#[derive(Default)]
struct MemoryFs {
    files: Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl FileWriter for MemoryFs {
    async fn write(&self, path: &str, content: &str) -> Result<(), ToolError> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }
}

fn config() -> Arc<GuardrailConfig> {
    Arc::new(GuardrailConfig::default())
}

// ── Command pipeline ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_confirmation_round_trip() {
    let exec = RecordingExecutor::new("removed 3 files\n");
    let audit = Arc::new(AuditLogger::new());
    let shell = GuardedShellTool::new(exec.clone(), config()).with_audit(audit.clone());

    let pending = shell
        .execute(serde_json::json!({"command": "rm -rf old_data"}))
        .await
        .unwrap();
    assert!(pending.flag("confirmation_required"));
    assert!(pending.output.contains("rm -rf old_data confirm: yes"));
    assert_eq!(pending.data.as_ref().unwrap()["command"], "rm -rf old_data");
    assert!(exec.calls().is_empty());

    let resubmit = pending.data.unwrap()["resubmit"].as_str().unwrap().to_string();
    let done = shell
        .execute(serde_json::json!({"command": resubmit}))
        .await
        .unwrap();
    assert!(done.success);
    assert!(done.flag("approved"));
    assert!(done.output.contains("removed 3 files"));
    assert_eq!(exec.calls(), vec![vec!["rm", "-rf", "old_data"]]);

    let outcomes: Vec<_> = audit.entries().into_iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes, vec![AuditOutcome::Pending, AuditOutcome::Success]);
}

#[tokio::test]
async fn e2e_chained_command_never_reaches_executor() {
    let exec = RecordingExecutor::new("");
    let shell = GuardedShellTool::new(exec.clone(), config());

    for command in ["git pull && npm install", "git pull && npm install confirm: yes"] {
        let result = shell
            .execute(serde_json::json!({"command": command}))
            .await
            .unwrap();
        assert!(result.flag("blocked"), "{command}");
        assert!(!result.flag("confirmation_required"));
    }
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn e2e_allowed_command_output_is_bounded() {
    let noisy: String = (0..200).map(|i| format!("Compiling crate_{i} v0.1.{i}\n")).collect();
    let exec = RecordingExecutor::new(&noisy);
    let shell = GuardedShellTool::new(exec.clone(), config());

    let result = shell
        .execute(serde_json::json!({"command": "cargo build"}))
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.output.starts_with("Command: cargo build\nReturn code: 0 in 0.04s\n"));
    assert!(result.output.contains("[TRUNCATED:"));
    assert!(result.output.len() < noisy.len());
    assert_eq!(exec.calls().len(), 1);
}

// ── Edit pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_runaway_overwrite_is_stopped() {
    let fs = Arc::new(MemoryFs::default());
    let writer = GuardedFileWriteTool::new(fs.clone(), config());

    let result = writer
        .execute(serde_json::json!({
            "path": "app.py",
            "content": "x".repeat(60_000),
            "operation": "overwrite"
        }))
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.output.contains("50,000"));

    let annotated = "# BEGIN REGION handler\ndef handle(req):\n    return ok(req)\n# END REGION\n";
    let result = writer
        .execute(serde_json::json!({
            "path": "app.py",
            "content": annotated,
            "operation": "overwrite"
        }))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(fs.files.lock().unwrap()["app.py"], annotated);
}

// ── Request veto ─────────────────────────────────────────────────────────

#[test]
fn e2e_banner_request_is_vetoed() {
    let config = GuardrailConfig::default();
    let banner = "*** SYSTEM READY ***\n".repeat(500);
    let decision = RequestVeto::new(&config.thresholds).vet(&banner, None);
    assert!(decision.reject);
    assert!(decision.reason.unwrap().contains("spam"));
}
