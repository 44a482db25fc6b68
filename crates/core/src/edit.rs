//! File edit types and the filesystem-write collaborator.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared kind of a proposed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Change part of a file.
    Edit,
    /// Replace the whole file.
    Overwrite,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!(
                "unknown operation '{other}' (expected 'edit' or 'overwrite')"
            )),
        }
    }
}

/// Verdict on a proposed write. A write collaborator must refuse to persist
/// content whose result is not valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

/// The filesystem-write collaborator.
#[async_trait]
pub trait FileWriter: Send + Sync {
    async fn write(&self, path: &str, content: &str) -> Result<(), ToolError>;
}
