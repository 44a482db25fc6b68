//! `agentguard validate-edit` — validate proposed content for a file write.

use agentguard_config::GuardrailConfig;
use agentguard_core::OperationKind;
use agentguard_security::{AuditEvent, AuditLogger, AuditOutcome, EditGuardrail};
use anyhow::anyhow;
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run(
    config: &GuardrailConfig,
    audit: &AuditLogger,
    file: &PathBuf,
    op: &str,
) -> anyhow::Result<ExitCode> {
    let operation: OperationKind = op.parse().map_err(|e: String| anyhow!(e))?;
    let content = crate::read_input(Some(file))?;

    let result = EditGuardrail::new(&config.thresholds).validate(&content, operation);
    match result.error {
        None => {
            println!("valid ({operation})");
            Ok(ExitCode::SUCCESS)
        }
        Some(error) => {
            let path = file.display().to_string();
            audit.log(
                AuditEvent::EditRejected { path: path.clone() },
                "validate-edit",
                &path,
                AuditOutcome::Denied,
                Some(error.clone()),
            );
            println!("invalid: {error}");
            Ok(ExitCode::from(crate::EXIT_REJECTED))
        }
    }
}
