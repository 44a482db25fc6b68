//! Guardrail policy for AgentGuard.
//!
//! - **Classifier**: allow / confirm / block for a tokenized command
//! - **Confirmation**: the resubmit-with-approval protocol around the classifier
//! - **Sanitizer**: spam detection, truncation, and digests for any text shown downstream
//! - **Edit**: structural validation of content before a write
//! - **Veto**: rejection of inbound requests before routing
//! - **Audit**: structured trail of guardrail decisions
//!
//! Everything here is synchronous and pure over its input plus a borrowed
//! [`agentguard_config::Thresholds`]; only the audit logger holds state.

pub mod audit;
pub mod classifier;
pub mod confirmation;
pub mod edit;
pub mod sanitizer;
pub mod veto;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use classifier::{
    CHAIN_OPERATORS, CommandParseError, CommandRiskClassifier, has_chaining, normalize_verb,
    parse_command_text, primary_verb,
};
pub use confirmation::{
    APPROVAL_MARKER, Approval, CommandRequest, ConfirmationGate, ConfirmationPrompt,
    ConfirmationState, GateOutcome, GateState, command_fingerprint, strip_approval_marker,
};
pub use edit::{EditGuardrail, count_regions};
pub use sanitizer::{OutputSanitizer, truncation_marker, wrap_command_output};
pub use veto::RequestVeto;
