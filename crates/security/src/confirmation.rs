//! Confirmation gate — turns a `confirm` verdict into a resubmission protocol.
//!
//! A risky-but-reversible command only runs when the *same* request carries
//! explicit approval, either as the trailing text marker `confirm: yes` or as
//! a structured [`Approval`] whose hash matches the command. Nothing is
//! remembered between calls.
//!
//! ```text
//! Unclassified ──▶ Allowed
//!      │      └──▶ Blocked
//!      └─────────▶ PendingConfirmation ──(approval)──▶ Approved
//! ```

use crate::classifier::{CommandParseError, CommandRiskClassifier, parse_command_text};
use agentguard_config::GuardrailConfig;
use agentguard_core::{CommandAssessment, CommandStatus, GuardrailError};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::{info, warn};

/// The literal a caller appends to approve a flagged command.
pub const APPROVAL_MARKER: &str = "confirm: yes";

/// Trailing marker, preceded by whitespace or at the very start of the payload.
static TRAILING_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)confirm(?:ed)?(?:\s*:\s*|\s+)(?:yes|ok|true|1)\s*$").ok()
});

/// A marker spread over one or more trailing argv tokens.
static MARKER_TOKENS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^confirm(?:ed)?(?:\s*:\s*|\s+)(?:yes|ok|true|1)$").ok()
});

/// Remove a trailing approval marker from command text.
///
/// Returns the remaining text and whether a well-formed marker was found.
/// Anything that is not exactly a trailing marker counts as absent.
pub fn strip_approval_marker(text: &str) -> (String, bool) {
    let Some(re) = TRAILING_MARKER.as_ref() else {
        return (text.to_string(), false);
    };
    match re.find(text) {
        Some(m) => (text[..m.start()].trim().to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Remove a trailing approval marker from already-tokenized argv
/// (`["rm", "x", "confirm:", "yes"]` → `["rm", "x"]`).
pub fn strip_approval_tokens(argv: &[String]) -> (Vec<String>, bool) {
    let Some(re) = MARKER_TOKENS.as_ref() else {
        return (argv.to_vec(), false);
    };
    for width in 1..=argv.len().min(3) {
        let split = argv.len() - width;
        if re.is_match(&argv[split..].join(" ")) {
            return (argv[..split].to_vec(), true);
        }
    }
    (argv.to_vec(), false)
}

/// SHA-256 of a command with whitespace collapsed, hex encoded.
pub fn command_fingerprint(command: &str) -> String {
    let canonical = command.split_whitespace().collect::<Vec<_>>().join(" ");
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Structured approval carried alongside a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub approved: bool,
    /// Must equal [`command_fingerprint`] of the command being approved.
    pub command_sha256: String,
}

impl Approval {
    /// Approve exactly this command text.
    pub fn for_command(command: &str) -> Self {
        Self {
            approved: true,
            command_sha256: command_fingerprint(command),
        }
    }

    fn covers(&self, command: &str) -> bool {
        self.approved && self.command_sha256.eq_ignore_ascii_case(&command_fingerprint(command))
    }
}

/// A command submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            approval: None,
        }
    }

    pub fn with_approval(mut self, approval: Approval) -> Self {
        self.approval = Some(approval);
        self
    }
}

/// Where a request ended up in the gate's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Unclassified,
    Allowed,
    Blocked,
    PendingConfirmation,
    Approved,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Allowed | Self::Blocked | Self::Approved)
    }
}

/// Transient per-request view of the confirmation protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationState {
    pub required: bool,
    pub reason: String,
    pub token_present: bool,
}

/// What the caller has to do to get a pending command executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub reason: String,
    /// The command exactly as submitted.
    pub command: String,
    /// The text to resubmit: the original command with the marker appended.
    pub resubmit: String,
}

impl ConfirmationPrompt {
    fn new(reason: &str, command: &str) -> Self {
        Self {
            reason: reason.to_string(),
            command: command.to_string(),
            resubmit: format!("{} {APPROVAL_MARKER}", command.trim_end()),
        }
    }

    /// Human-readable prompt including the exact resubmission text.
    pub fn message(&self) -> String {
        format!(
            "Command requires confirmation ({}). \
             Re-run the request with '{APPROVAL_MARKER}' appended to proceed:\n  {}",
            self.reason, self.resubmit
        )
    }
}

/// The gate's decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Execution may go ahead with `argv` (marker already stripped).
    Proceed {
        argv: Vec<String>,
        assessment: CommandAssessment,
        /// True when a `confirm` command was released by explicit approval.
        approved: bool,
    },
    /// Never executed, approval or not.
    Blocked {
        assessment: CommandAssessment,
        command: String,
    },
    /// Deferred until the caller resubmits with approval.
    ConfirmationRequired { prompt: ConfirmationPrompt },
}

impl GateOutcome {
    pub fn state(&self) -> GateState {
        match self {
            Self::Proceed { approved: true, .. } => GateState::Approved,
            Self::Proceed { .. } => GateState::Allowed,
            Self::Blocked { .. } => GateState::Blocked,
            Self::ConfirmationRequired { .. } => GateState::PendingConfirmation,
        }
    }

    pub fn confirmation_required(&self) -> bool {
        matches!(self, Self::ConfirmationRequired { .. })
    }

    pub fn may_execute(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }

    /// The outcome as a guardrail error, for callers that use `?`.
    pub fn into_result(self) -> Result<(Vec<String>, bool), GuardrailError> {
        match self {
            Self::Proceed { argv, approved, .. } => Ok((argv, approved)),
            Self::Blocked { assessment, .. } => Err(GuardrailError::PolicyViolation {
                reason: assessment.reason,
            }),
            Self::ConfirmationRequired { prompt } => Err(GuardrailError::ApprovalRequired {
                reason: prompt.reason,
                command: prompt.command,
            }),
        }
    }
}

/// Classifier plus approval protocol. Stateless across calls.
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    classifier: CommandRiskClassifier,
    accept_legacy_marker: bool,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::from_config(&GuardrailConfig::default())
    }
}

impl ConfirmationGate {
    pub fn from_config(config: &GuardrailConfig) -> Self {
        Self {
            classifier: CommandRiskClassifier::new(&config.commands),
            accept_legacy_marker: config.approval.accept_legacy_marker,
        }
    }

    pub fn classifier(&self) -> &CommandRiskClassifier {
        &self.classifier
    }

    /// Gate a raw-text request.
    pub fn evaluate(&self, request: &CommandRequest) -> Result<GateOutcome, CommandParseError> {
        let (stripped, marker) = if self.accept_legacy_marker {
            strip_approval_marker(&request.command)
        } else {
            (request.command.clone(), false)
        };
        let structured = request
            .approval
            .as_ref()
            .is_some_and(|a| a.covers(&stripped));

        let argv = parse_command_text(&stripped)?;
        Ok(self.decide(argv, &request.command, marker || structured))
    }

    /// Gate argv handed over by the execution collaborator.
    pub fn evaluate_argv(&self, argv: &[String], approval: Option<&Approval>) -> GateOutcome {
        let (argv, marker) = if self.accept_legacy_marker {
            strip_approval_tokens(argv)
        } else {
            (argv.to_vec(), false)
        };
        let command = shell_words::join(&argv);
        let structured = approval.is_some_and(|a| a.covers(&command));
        self.decide(argv, &command, marker || structured)
    }

    /// Per-request confirmation state, without deciding execution.
    pub fn confirmation_state(
        &self,
        request: &CommandRequest,
    ) -> Result<ConfirmationState, CommandParseError> {
        let outcome = self.evaluate(request)?;
        let (_, marker) = strip_approval_marker(&request.command);
        Ok(match outcome {
            GateOutcome::ConfirmationRequired { prompt } => ConfirmationState {
                required: true,
                reason: prompt.reason,
                token_present: false,
            },
            GateOutcome::Proceed { assessment, approved, .. } => ConfirmationState {
                required: false,
                reason: assessment.reason,
                token_present: approved || marker,
            },
            GateOutcome::Blocked { assessment, .. } => ConfirmationState {
                required: false,
                reason: assessment.reason,
                token_present: marker,
            },
        })
    }

    fn decide(&self, argv: Vec<String>, original: &str, token_present: bool) -> GateOutcome {
        let assessment = self.classifier.assess(&argv);
        match assessment.status {
            CommandStatus::Block => {
                if token_present {
                    warn!(command = %original, "Approval ignored for blocked command");
                }
                GateOutcome::Blocked {
                    assessment,
                    command: original.to_string(),
                }
            }
            CommandStatus::Confirm if token_present => {
                info!(command = %original, reason = %assessment.reason, "Command approved");
                GateOutcome::Proceed {
                    argv,
                    assessment,
                    approved: true,
                }
            }
            CommandStatus::Confirm => GateOutcome::ConfirmationRequired {
                prompt: ConfirmationPrompt::new(&assessment.reason, original),
            },
            CommandStatus::Allow => GateOutcome::Proceed {
                argv,
                assessment,
                approved: false,
            },
        }
    }
}
