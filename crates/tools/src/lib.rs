//! Guarded tool implementations for AgentGuard.
//!
//! Each tool wraps a collaborator that touches the system (a
//! [`CommandExecutor`](agentguard_core::CommandExecutor) or a
//! [`FileWriter`](agentguard_core::FileWriter)) and runs the matching
//! guardrails before handing anything to it.

pub mod file_write;
pub mod shell;

pub use file_write::GuardedFileWriteTool;
pub use shell::GuardedShellTool;
