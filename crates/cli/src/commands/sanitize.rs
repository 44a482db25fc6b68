//! `agentguard sanitize` — bound and inspect text before display.

use agentguard_config::GuardrailConfig;
use agentguard_security::{AuditEvent, AuditLogger, AuditOutcome, OutputSanitizer};
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run(
    config: &GuardrailConfig,
    audit: &AuditLogger,
    file: Option<&PathBuf>,
    max: Option<usize>,
) -> anyhow::Result<ExitCode> {
    let text = crate::read_input(file)?;
    let output = OutputSanitizer::new(&config.thresholds).sanitize(&text, max);

    println!("{}", output.visible_text);
    if let Some(rejection) = output.rejection() {
        let source = file.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
        audit.log(
            AuditEvent::OutputRejected {
                reason: rejection.to_string(),
            },
            "sanitize",
            &source,
            AuditOutcome::Denied,
            None,
        );
        if let Some(digest) = &output.digest {
            eprintln!("{digest}");
        }
        return Ok(ExitCode::from(crate::EXIT_REJECTED));
    }
    Ok(ExitCode::SUCCESS)
}
