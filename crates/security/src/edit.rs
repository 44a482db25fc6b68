//! Edit guardrail — structural checks on content headed for disk.
//!
//! Mirrors the output spam heuristics, but here a wrong "accept" silently
//! corrupts a file instead of cluttering a display. First failure wins:
//!
//! 1. size over the edit ceiling
//! 2. a single unbroken line longer than the inline-snippet size
//! 3. malformed region markers, or an overwrite with no region at all
//! 4. too few distinct lines
//!
//! Region markers are comment lines such as `# BEGIN REGION` / `# END REGION`
//! or `// EDIT START` / `// EDIT END`. Several disjoint regions are fine;
//! nested, crossed, or unpaired markers are not.

use crate::sanitizer::unique_line_ratio;
use agentguard_config::Thresholds;
use agentguard_core::{EditValidationResult, GuardrailError, OperationKind};
use tracing::{debug, warn};

const COMMENT_PREFIXES: [&str; 5] = ["<!--", "/*", "//", "--", "#"];
const COMMENT_TERMINATORS: [&str; 2] = ["-->", "*/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerFamily {
    Region,
    Edit,
}

impl MarkerFamily {
    fn begin(&self) -> &'static str {
        match self {
            Self::Region => "BEGIN REGION",
            Self::Edit => "EDIT START",
        }
    }

    fn end(&self) -> &'static str {
        match self {
            Self::Region => "END REGION",
            Self::Edit => "EDIT END",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Begin(MarkerFamily),
    End(MarkerFamily),
}

fn parse_marker(line: &str) -> Option<Marker> {
    let mut body = line.trim();
    if let Some(prefix) = COMMENT_PREFIXES.iter().find(|p| body.starts_with(**p)) {
        body = body[prefix.len()..].trim_start();
    }
    let upper = body.to_ascii_uppercase();
    [MarkerFamily::Region, MarkerFamily::Edit]
        .into_iter()
        .find_map(|family| {
            if is_keyword(&upper, family.begin()) {
                Some(Marker::Begin(family))
            } else if is_keyword(&upper, family.end()) {
                Some(Marker::End(family))
            } else {
                None
            }
        })
}

/// `keyword` at the start of `body`, followed by end of line, whitespace,
/// or a comment terminator (`BEGIN REGIONAL` is not a marker).
fn is_keyword(body: &str, keyword: &str) -> bool {
    body.strip_prefix(keyword).is_some_and(|rest| {
        rest.is_empty()
            || rest.starts_with(char::is_whitespace)
            || COMMENT_TERMINATORS.iter().any(|t| rest.starts_with(t))
    })
}

/// Check that region markers pair up. Returns the number of complete regions.
pub fn count_regions(content: &str) -> Result<usize, GuardrailError> {
    let mut open: Option<(MarkerFamily, usize)> = None;
    let mut regions = 0;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        match (parse_marker(line), open) {
            (Some(Marker::Begin(_)), Some((family, start))) => {
                return Err(GuardrailError::StructuralViolation(format!(
                    "overlapping region at line {line_no}: region '{}' opened at line {start} is still open",
                    family.begin()
                )));
            }
            (Some(Marker::Begin(family)), None) => open = Some((family, line_no)),
            (Some(Marker::End(family)), None) => {
                return Err(GuardrailError::StructuralViolation(format!(
                    "unmatched '{}' marker at line {line_no}",
                    family.end()
                )));
            }
            (Some(Marker::End(family)), Some((opened, start))) => {
                if family != opened {
                    return Err(GuardrailError::StructuralViolation(format!(
                        "region '{}' opened at line {start} closed by '{}' at line {line_no}",
                        opened.begin(),
                        family.end()
                    )));
                }
                open = None;
                regions += 1;
            }
            (None, _) => {}
        }
    }

    if let Some((family, start)) = open {
        return Err(GuardrailError::StructuralViolation(format!(
            "region '{}' opened at line {start} is never closed",
            family.begin()
        )));
    }
    Ok(regions)
}

/// Validates proposed file content before a write collaborator may persist it.
#[derive(Debug, Clone, Copy)]
pub struct EditGuardrail<'a> {
    thresholds: &'a Thresholds,
}

impl<'a> EditGuardrail<'a> {
    pub fn new(thresholds: &'a Thresholds) -> Self {
        Self { thresholds }
    }

    /// Run every rule; the first failure is returned.
    pub fn check(&self, content: &str, operation: OperationKind) -> Result<(), GuardrailError> {
        let t = self.thresholds;
        let length = content.chars().count();

        if length > t.edit_size_ceiling {
            return Err(GuardrailError::OversizeContent {
                what: "File content".into(),
                limit: t.edit_size_ceiling,
                observed: length,
            });
        }

        if length > t.inline_snippet_max && !content.contains('\n') {
            return Err(GuardrailError::StructuralViolation(format!(
                "Rejected unstructured blob: no line breaks detected in {length} characters"
            )));
        }

        let regions = count_regions(content)?;
        if operation == OperationKind::Overwrite && regions == 0 {
            return Err(GuardrailError::StructuralViolation(
                "Overwrite rejected: must use annotated regions (BEGIN REGION / END REGION)".into(),
            ));
        }

        if let Some((unique, total)) = unique_line_ratio(content, t.ratio_min_lines)
            && (unique as f64) < (total as f64) * t.min_unique_line_ratio
        {
            return Err(GuardrailError::StructuralViolation(format!(
                "Rejected repetitive content: {unique} of {total} lines unique (< {:.0}% unique lines)",
                t.min_unique_line_ratio * 100.0
            )));
        }

        Ok(())
    }

    /// Validate and report the result in collaborator form.
    pub fn validate(&self, content: &str, operation: OperationKind) -> EditValidationResult {
        match self.check(content, operation) {
            Ok(()) => {
                debug!(operation = %operation, length = content.len(), "Edit accepted");
                EditValidationResult::valid()
            }
            Err(e) => {
                warn!(operation = %operation, error = %e, "Edit rejected");
                let message = match e {
                    GuardrailError::StructuralViolation(reason) => reason,
                    other => other.to_string(),
                };
                EditValidationResult::invalid(message)
            }
        }
    }
}
