//! Sanitized-output types shared by the sanitizer, the request veto, and
//! the tools that surface command output.

use crate::error::GuardrailError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which degenerate-pattern rule fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpamKind {
    /// A single line is longer than the long-line threshold.
    LongLine { line: usize, length: usize, limit: usize },
    /// A short unit repeats back-to-back too many times.
    RepeatedUnit { unit: String, repeats: usize },
    /// Too few distinct lines.
    LowUniqueRatio { unique: usize, total: usize },
    /// Too much of the text is drawn from ASCII-art characters.
    SymbolDensity { percent: u32 },
}

impl fmt::Display for SpamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongLine { line, length, limit } => write!(
                f,
                "line {line} is {length} characters long (limit {limit})"
            ),
            Self::RepeatedUnit { unit, repeats } => {
                write!(f, "pattern {unit:?} repeated {repeats} times in a row")
            }
            Self::LowUniqueRatio { unique, total } => write!(
                f,
                "only {unique} unique lines out of {total}"
            ),
            Self::SymbolDensity { percent } => {
                write!(f, "{percent}% of characters are ASCII-art symbols")
            }
        }
    }
}

/// Compact summary offered instead of content too large to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub char_count: usize,
    pub line_count: usize,
    pub head_sample: String,
    pub tail_sample: String,
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[OUTPUT DIGEST: {} characters, {} lines]\nFirst {} chars: {}\n...\nLast {} chars: {}",
            self.char_count,
            self.line_count,
            self.head_sample.chars().count(),
            self.head_sample,
            self.tail_sample.chars().count(),
            self.tail_sample,
        )
    }
}

/// How the sanitizer treated its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SanitizeVerdict {
    Clean,
    Truncated { elided: usize },
    Spam { detected: SpamKind },
    Oversize { limit: usize, observed: usize },
}

/// The only form of raw text any downstream consumer receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedOutput {
    pub visible_text: String,
    pub truncated: bool,
    /// Length of the raw input in characters.
    pub original_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    pub verdict: SanitizeVerdict,
}

impl SanitizedOutput {
    /// True when the raw text was withheld entirely (spam or oversize).
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.verdict,
            SanitizeVerdict::Spam { .. } | SanitizeVerdict::Oversize { .. }
        )
    }

    /// Why the text was withheld, if it was.
    pub fn rejection(&self) -> Option<GuardrailError> {
        match &self.verdict {
            SanitizeVerdict::Spam { detected } => Some(GuardrailError::SpamDetected {
                reason: detected.to_string(),
            }),
            SanitizeVerdict::Oversize { limit, observed } => {
                Some(GuardrailError::OversizeContent {
                    what: "Output".into(),
                    limit: *limit,
                    observed: *observed,
                })
            }
            SanitizeVerdict::Clean | SanitizeVerdict::Truncated { .. } => None,
        }
    }
}

/// Outcome of vetting an inbound request before routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoDecision {
    pub reject: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VetoDecision {
    pub fn pass() -> Self {
        Self {
            reject: false,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            reject: true,
            reason: Some(reason.into()),
        }
    }
}
