//! `agentguard veto` — screen an inbound request before routing.

use agentguard_config::GuardrailConfig;
use agentguard_security::{AuditLogger, RequestVeto};
use std::process::ExitCode;

pub fn run(
    config: &GuardrailConfig,
    audit: &AuditLogger,
    text: Option<String>,
) -> anyhow::Result<ExitCode> {
    let text = match text {
        Some(text) => text,
        None => crate::read_input(None)?,
    };

    let decision = RequestVeto::new(&config.thresholds)
        .with_audit(audit)
        .vet(&text, None);
    if decision.reject {
        println!("reject: {}", decision.reason.unwrap_or_default());
        return Ok(ExitCode::from(crate::EXIT_REJECTED));
    }
    println!("pass");
    Ok(ExitCode::SUCCESS)
}
