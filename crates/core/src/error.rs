//! Error types for the AgentGuard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Guardrail rejections and collaborator failures are kept apart so callers
//! can tell "the policy said no" from "the world broke".

use thiserror::Error;

/// Every way a guardrail can refuse an input.
///
/// All variants are local and recoverable: the caller adjusts its input and
/// tries again. Each carries a reason that is safe to show an end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardrailError {
    /// A destructive verb or a chaining pattern matched. Never auto-retried.
    #[error("Command blocked: {reason}")]
    PolicyViolation { reason: String },

    /// Not a failure: the action is deferred until the caller resubmits with approval.
    #[error("Command '{command}' requires confirmation ({reason})")]
    ApprovalRequired { reason: String, command: String },

    /// Output or inbound text matched a degenerate-pattern heuristic.
    #[error("Spam detected: {reason}")]
    SpamDetected { reason: String },

    /// A length ceiling was exceeded.
    #[error(
        "{what} too large: {} characters exceeds {} limit",
        group_digits(.observed),
        group_digits(.limit)
    )]
    OversizeContent {
        what: String,
        limit: usize,
        observed: usize,
    },

    /// A proposed edit is missing a required structural property.
    #[error("Structural violation: {0}")]
    StructuralViolation(String),
}

/// Render a count with thousands separators (`50000` → `50,000`).
pub fn group_digits(n: &usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Permission denied: {tool_name} — {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Write failed for {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}
