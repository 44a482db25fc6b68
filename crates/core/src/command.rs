//! Command domain types — what the classifier produces and what the
//! execution collaborator consumes and returns.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Risk verdict for a command. Serializes as the literal strings
/// `"allow"`, `"confirm"` and `"block"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Allow,
    Confirm,
    Block,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Confirm => "confirm",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's answer for one command. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAssessment {
    pub status: CommandStatus,
    /// Free text, safe for direct end-user display.
    pub reason: String,
}

impl CommandAssessment {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Allow,
            reason: reason.into(),
        }
    }

    pub fn confirm(reason: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Confirm,
            reason: reason.into(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Block,
            reason: reason.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == CommandStatus::Block
    }
}

/// Raw result handed back by the execution collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunResult {
    pub command: Vec<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandRunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The process-spawning collaborator.
///
/// Only ever receives argv that has already cleared the classifier and the
/// confirmation gate.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, argv: &[String]) -> Result<CommandRunResult, ToolError>;
}
