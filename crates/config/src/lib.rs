//! Configuration loading and validation for AgentGuard.
//!
//! The guardrail engine reads every magic number from one immutable
//! [`GuardrailConfig`], built once at startup and passed by reference into
//! each component. Loads from a TOML file (path from `AGENTGUARD_CONFIG`)
//! with environment variable overrides for the most commonly tuned caps.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Size and ratio limits
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Extra verbs added to the built-in command sets
    #[serde(default)]
    pub commands: CommandPolicyConfig,

    /// Approval protocol settings
    #[serde(default)]
    pub approval: ApprovalConfig,
}

/// Every numeric limit the guardrails consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Display cap for command output (characters)
    #[serde(default = "default_output_cap")]
    pub output_cap: usize,

    /// Display cap for diagnostic messages
    #[serde(default = "default_diagnostic_cap")]
    pub diagnostic_cap: usize,

    /// Display cap for file content
    #[serde(default = "default_file_content_cap")]
    pub file_content_cap: usize,

    /// Output longer than this is rejected instead of truncated
    #[serde(default = "default_hard_ceiling")]
    pub output_hard_ceiling: usize,

    /// Proposed file content longer than this is rejected
    #[serde(default = "default_hard_ceiling")]
    pub edit_size_ceiling: usize,

    /// Inbound request text longer than this is vetoed
    #[serde(default = "default_request_cap")]
    pub request_cap: usize,

    /// Below this fraction of distinct lines, text is treated as degenerate
    #[serde(default = "default_min_unique_ratio")]
    pub min_unique_line_ratio: f64,

    /// The unique-line ratio only applies from this many lines on
    #[serde(default = "default_ratio_min_lines")]
    pub ratio_min_lines: usize,

    /// A single line longer than this is spam
    #[serde(default = "default_long_line")]
    pub long_line_threshold: usize,

    /// A 1–4 character unit repeated back-to-back this many times is spam
    #[serde(default = "default_repetition")]
    pub repetition_threshold: usize,

    /// Maximum fraction of ASCII-art symbols (`*.-|/\#`)
    #[serde(default = "default_symbol_ratio")]
    pub max_symbol_ratio: f64,

    /// Text shorter than this is never considered spam
    #[serde(default = "default_spam_min_length")]
    pub spam_min_length: usize,

    /// Single-line content longer than this is an unstructured blob
    #[serde(default = "default_inline_snippet")]
    pub inline_snippet_max: usize,

    /// Characters kept in each digest sample
    #[serde(default = "default_digest_sample")]
    pub digest_sample: usize,
}

fn default_output_cap() -> usize {
    500
}
fn default_diagnostic_cap() -> usize {
    2000
}
fn default_file_content_cap() -> usize {
    10_000
}
fn default_hard_ceiling() -> usize {
    50_000
}
fn default_request_cap() -> usize {
    5000
}
fn default_min_unique_ratio() -> f64 {
    0.10
}
fn default_ratio_min_lines() -> usize {
    50
}
fn default_long_line() -> usize {
    200
}
fn default_repetition() -> usize {
    100
}
fn default_symbol_ratio() -> f64 {
    0.30
}
fn default_spam_min_length() -> usize {
    500
}
fn default_inline_snippet() -> usize {
    1000
}
fn default_digest_sample() -> usize {
    100
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            output_cap: default_output_cap(),
            diagnostic_cap: default_diagnostic_cap(),
            file_content_cap: default_file_content_cap(),
            output_hard_ceiling: default_hard_ceiling(),
            edit_size_ceiling: default_hard_ceiling(),
            request_cap: default_request_cap(),
            min_unique_line_ratio: default_min_unique_ratio(),
            ratio_min_lines: default_ratio_min_lines(),
            long_line_threshold: default_long_line(),
            repetition_threshold: default_repetition(),
            max_symbol_ratio: default_symbol_ratio(),
            spam_min_length: default_spam_min_length(),
            inline_snippet_max: default_inline_snippet(),
            digest_sample: default_digest_sample(),
        }
    }
}

/// Verbs appended to the built-in command sets. The built-in sets can be
/// extended but never shrunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandPolicyConfig {
    #[serde(default)]
    pub extra_blocked: Vec<String>,

    #[serde(default)]
    pub extra_file_mutation: Vec<String>,

    #[serde(default)]
    pub extra_installers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Accept the trailing `confirm: yes` text marker alongside structured approval
    #[serde(default = "default_true")]
    pub accept_legacy_marker: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            accept_legacy_marker: true,
        }
    }
}

impl GuardrailConfig {
    /// Load configuration from `AGENTGUARD_CONFIG` (or the default path),
    /// then apply environment overrides:
    /// - `AGENTGUARD_OUTPUT_CAP`
    /// - `AGENTGUARD_REQUEST_CAP`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("AGENTGUARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_from(&path)?;

        if let Some(cap) = env_usize("AGENTGUARD_OUTPUT_CAP")? {
            config.thresholds.output_cap = cap;
        }
        if let Some(cap) = env_usize("AGENTGUARD_REQUEST_CAP")? {
            config.thresholds.request_cap = cap;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        tracing::info!(path = %path.display(), "Loaded guardrail config");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location: `./agentguard.toml`.
    pub fn default_path() -> PathBuf {
        PathBuf::from("agentguard.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;

        let caps = [
            ("output_cap", t.output_cap),
            ("diagnostic_cap", t.diagnostic_cap),
            ("file_content_cap", t.file_content_cap),
            ("output_hard_ceiling", t.output_hard_ceiling),
            ("edit_size_ceiling", t.edit_size_ceiling),
            ("request_cap", t.request_cap),
            ("long_line_threshold", t.long_line_threshold),
            ("repetition_threshold", t.repetition_threshold),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
            }
        }

        for (name, ratio) in [
            ("min_unique_line_ratio", t.min_unique_line_ratio),
            ("max_symbol_ratio", t.max_symbol_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be in (0.0, 1.0]"
                )));
            }
        }

        if t.output_cap >= t.output_hard_ceiling {
            return Err(ConfigError::ValidationError(
                "output_cap must be smaller than output_hard_ceiling".into(),
            ));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML (for `agentguard config`).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

fn env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{key} must be a positive integer, got '{raw}'"
                ))
            }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
