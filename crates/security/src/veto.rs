//! Request veto — the first gate in front of routing.
//!
//! No specialist agent ever sees inbound text that is degenerate or
//! oversized. Pattern detection is shared with the output sanitizer.

use crate::audit::{AuditEvent, AuditLogger, AuditOutcome};
use crate::sanitizer::OutputSanitizer;
use agentguard_config::Thresholds;
use agentguard_core::{GuardrailError, VetoDecision};
use tracing::warn;

const AUDIT_PREVIEW: usize = 80;

#[derive(Debug, Clone, Copy)]
pub struct RequestVeto<'a> {
    thresholds: &'a Thresholds,
    audit: Option<&'a AuditLogger>,
}

impl<'a> RequestVeto<'a> {
    pub fn new(thresholds: &'a Thresholds) -> Self {
        Self {
            thresholds,
            audit: None,
        }
    }

    /// Record every rejection to `audit`.
    pub fn with_audit(mut self, audit: &'a AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Spam first, then length. `max_length` defaults to the request cap.
    pub fn check(&self, text: &str, max_length: Option<usize>) -> Result<(), GuardrailError> {
        if let Some(detected) = OutputSanitizer::new(self.thresholds).detect_spam(text) {
            return Err(GuardrailError::SpamDetected {
                reason: detected.to_string(),
            });
        }

        let limit = max_length.unwrap_or(self.thresholds.request_cap);
        let observed = text.chars().count();
        if observed > limit {
            return Err(GuardrailError::OversizeContent {
                what: "Request".into(),
                limit,
                observed,
            });
        }
        Ok(())
    }

    pub fn vet(&self, text: &str, max_length: Option<usize>) -> VetoDecision {
        match self.check(text, max_length) {
            Ok(()) => VetoDecision::pass(),
            Err(e) => {
                warn!(length = text.len(), error = %e, "Request vetoed");
                let reason = match e {
                    GuardrailError::SpamDetected { reason } => {
                        format!("Detected repetitive pattern spam: {reason}")
                    }
                    other => other.to_string(),
                };
                if let Some(audit) = self.audit {
                    let preview: String = text.chars().take(AUDIT_PREVIEW).collect();
                    audit.log(
                        AuditEvent::RequestVetoed,
                        "request_veto",
                        &preview,
                        AuditOutcome::Denied,
                        Some(reason.clone()),
                    );
                }
                VetoDecision::reject(reason)
            }
        }
    }
}
