//! `agentguard check` — classify a command and apply the confirmation gate.

use agentguard_config::GuardrailConfig;
use agentguard_security::{AuditEvent, AuditLogger, AuditOutcome, ConfirmationGate, GateOutcome};
use std::process::ExitCode;

const EXIT_CONFIRM: u8 = 2;

pub fn run(
    config: &GuardrailConfig,
    audit: &AuditLogger,
    argv: &[String],
    json: bool,
) -> anyhow::Result<ExitCode> {
    let gate = ConfirmationGate::from_config(config);
    let outcome = gate.evaluate_argv(argv, None);
    let state = outcome.state();
    let command = argv.join(" ");

    let (status, reason, code) = match &outcome {
        GateOutcome::Proceed {
            assessment,
            approved,
            ..
        } => {
            let event = if *approved {
                AuditEvent::CommandApproved
            } else {
                AuditEvent::CommandAllowed
            };
            audit.log(event, "check", &command, AuditOutcome::Success, None);
            (assessment.status.as_str(), assessment.reason.clone(), 0)
        }
        GateOutcome::Blocked { assessment, .. } => {
            audit.log(
                AuditEvent::CommandBlocked {
                    reason: assessment.reason.clone(),
                },
                "check",
                &command,
                AuditOutcome::Denied,
                None,
            );
            (
                assessment.status.as_str(),
                assessment.reason.clone(),
                crate::EXIT_REJECTED,
            )
        }
        GateOutcome::ConfirmationRequired { prompt } => {
            audit.log(
                AuditEvent::ConfirmationRequested {
                    reason: prompt.reason.clone(),
                },
                "check",
                &command,
                AuditOutcome::Pending,
                None,
            );
            ("confirm", prompt.reason.clone(), EXIT_CONFIRM)
        }
    };

    if json {
        let mut report = serde_json::json!({
            "status": status,
            "state": state,
            "reason": reason,
        });
        if let GateOutcome::ConfirmationRequired { prompt } = &outcome {
            report["resubmit"] = serde_json::Value::String(prompt.resubmit.clone());
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &outcome {
            GateOutcome::ConfirmationRequired { prompt } => println!("{}", prompt.message()),
            _ => println!("{status}: {reason}"),
        }
    }

    Ok(ExitCode::from(code))
}
