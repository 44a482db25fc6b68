//! Audit logging — structured record of every guardrail decision.
//!
//! Entries are kept in memory and fanned out to any number of sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub actor: String,
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Guardrail decisions worth keeping a trail of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    CommandAllowed,
    CommandBlocked { reason: String },
    ConfirmationRequested { reason: String },
    /// A confirm-status command ran with a valid approval.
    CommandApproved,
    OutputRejected { reason: String },
    EditRejected { path: String },
    RequestVetoed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
    Pending,
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// In-memory audit logger with optional forwarding sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
        }
    }

    // A panic while holding the lock leaves the Vec intact.
    fn store(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an event and forward it to every sink.
    pub fn log(
        &self,
        event: AuditEvent,
        actor: &str,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            actor: actor.into(),
            target: target.into(),
            outcome,
            details,
        };

        self.store().push(entry.clone());
        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.store().clone()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.store()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.store().clear();
    }

    pub fn count(&self) -> usize {
        self.store().len()
    }
}

/// Sink that writes entries as `tracing` events under the `audit` target.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            target: "audit",
            event = ?entry.event,
            actor = %entry.actor,
            subject = %entry.target,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn log_and_filter_by_outcome() {
        let logger = AuditLogger::new();
        logger.log(AuditEvent::CommandAllowed, "shell", "git status", AuditOutcome::Success, None);
        logger.log(
            AuditEvent::CommandBlocked {
                reason: "command chaining detected".into(),
            },
            "shell",
            "git pull && npm install",
            AuditOutcome::Denied,
            None,
        );
        logger.log(
            AuditEvent::ConfirmationRequested {
                reason: "'rm' modifies files".into(),
            },
            "shell",
            "rm -rf old_data",
            AuditOutcome::Pending,
            None,
        );

        assert_eq!(logger.count(), 3);
        let denied = logger.entries_by_outcome(&AuditOutcome::Denied);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].target, "git pull && npm install");

        logger.clear();
        assert_eq!(logger.count(), 0);
    }

    #[test]
    fn entry_serializes_with_tagged_event() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event: AuditEvent::EditRejected {
                path: "src/main.rs".into(),
            },
            actor: "file_write".into(),
            target: "src/main.rs".into(),
            outcome: AuditOutcome::Denied,
            details: Some("Overwrite rejected".into()),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"edit_rejected""#));
        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, entry.event);
        assert_eq!(back.outcome, AuditOutcome::Denied);
    }

    #[test]
    fn custom_sink_receives_events() {
        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.target.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::with_sinks(vec![Box::new(TestSink {
            received: received.clone(),
        })]);
        logger.log(AuditEvent::RequestVetoed, "router", "inbound", AuditOutcome::Denied, None);

        assert_eq!(received.lock().unwrap().as_slice(), ["inbound"]);
    }

    #[test]
    fn debug_format() {
        let debug_str = format!("{:?}", AuditLogger::default());
        assert!(debug_str.contains("entry_count: 0"));
    }
}
