//! # AgentGuard Core
//!
//! Domain types, collaborator traits, and error definitions for the AgentGuard
//! guardrail engine. This crate holds no policy: it defines the vocabulary
//! that the config, security, and tools crates implement against.
//!
//! The collaborators that actually touch the system (process execution,
//! filesystem writes) are traits here. Implementations live with the caller.

pub mod command;
pub mod edit;
pub mod error;
pub mod output;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use command::{CommandAssessment, CommandExecutor, CommandRunResult, CommandStatus};
pub use edit::{EditValidationResult, FileWriter, OperationKind};
pub use error::{GuardrailError, ToolError, group_digits};
pub use output::{Digest, SanitizeVerdict, SanitizedOutput, SpamKind, VetoDecision};
pub use tool::{Tool, ToolDefinition, ToolResult};
