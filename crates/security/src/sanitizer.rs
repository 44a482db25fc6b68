//! Output sanitizing — bound and inspect any text before it is displayed,
//! stored, or handed to another agent.
//!
//! Detection runs before any length handling and rejects instead of
//! truncating, so a degenerate payload never reaches a consumer even in
//! shortened form. The rules, applied to text of at least `spam_min_length`
//! characters, in order:
//!
//! - **long line**: a line longer than `long_line_threshold`
//! - **repeated unit**: a 1–4 character unit (not all whitespace) repeated
//!   back-to-back at least `repetition_threshold` times
//! - **unique-line ratio**: at least `ratio_min_lines` lines with fewer than
//!   `min_unique_line_ratio` of them distinct
//! - **symbol density**: more than `max_symbol_ratio` of all characters drawn
//!   from `*.-|/\#`
//!
//! All lengths are in characters, never bytes.

use agentguard_config::Thresholds;
use agentguard_core::{Digest, GuardrailError, SanitizeVerdict, SanitizedOutput, SpamKind};
use std::collections::HashSet;
use tracing::{debug, warn};

const ASCII_ART_CHARS: &str = "*.-|/\\#";
const MAX_UNIT_LEN: usize = 4;

/// Marker appended to truncated output.
pub fn truncation_marker(elided: usize) -> String {
    format!("\n... [TRUNCATED: {elided} more characters]")
}

/// Wrap already-sanitized command streams in delimiters so a consuming agent
/// treats the region as data, never as instructions.
pub fn wrap_command_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!(
            "<terminal_output begin>\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}\n<terminal_output end>"
        ),
        (false, true) => {
            format!("<terminal_output begin>\nSTDOUT:\n{stdout}\n<terminal_output end>")
        }
        (true, false) => {
            format!("<terminal_output begin>\nSTDERR:\n{stderr}\n<terminal_output end>")
        }
        (true, true) => "(No output)".to_string(),
    }
}

/// Distinct and total line counts, or `None` if there are too few lines to judge.
pub(crate) fn unique_line_ratio(text: &str, min_lines: usize) -> Option<(usize, usize)> {
    let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    if lines.len() < min_lines {
        return None;
    }
    let unique = lines.iter().collect::<HashSet<_>>().len();
    Some((unique, lines.len()))
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn last_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

/// Find the first run of a short unit repeated at least `threshold` times.
fn repeated_unit(chars: &[char], threshold: usize) -> Option<(String, usize)> {
    for len in 1..=MAX_UNIT_LEN {
        if chars.len() < len * threshold {
            continue;
        }
        // `run` counts positions j where chars[j] == chars[j - len]
        let mut run = 0usize;
        let mut j = len;
        while j < chars.len() {
            if chars[j] == chars[j - len] {
                run += 1;
                let repeats = (run + len) / len;
                if repeats >= threshold {
                    let start = j + 1 - (run + len);
                    let unit = &chars[start..start + len];
                    if !unit.iter().all(|c| c.is_whitespace()) {
                        while j + 1 < chars.len() && chars[j + 1] == chars[j + 1 - len] {
                            run += 1;
                            j += 1;
                        }
                        return Some((unit.iter().collect(), (run + len) / len));
                    }
                }
            } else {
                run = 0;
            }
            j += 1;
        }
    }
    None
}

/// Bounds and inspects text against a fixed set of thresholds.
///
/// Pure: the same text and thresholds always give the same result.
#[derive(Debug, Clone, Copy)]
pub struct OutputSanitizer<'a> {
    thresholds: &'a Thresholds,
}

impl<'a> OutputSanitizer<'a> {
    pub fn new(thresholds: &'a Thresholds) -> Self {
        Self { thresholds }
    }

    /// Return the first degenerate-pattern rule the text trips, if any.
    pub fn detect_spam(&self, text: &str) -> Option<SpamKind> {
        let t = self.thresholds;
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < t.spam_min_length {
            return None;
        }

        for (idx, line) in text.split('\n').enumerate() {
            let length = line.trim_end_matches('\r').chars().count();
            if length > t.long_line_threshold {
                return Some(SpamKind::LongLine {
                    line: idx + 1,
                    length,
                    limit: t.long_line_threshold,
                });
            }
        }

        if let Some((unit, repeats)) = repeated_unit(&chars, t.repetition_threshold) {
            return Some(SpamKind::RepeatedUnit { unit, repeats });
        }

        if let Some((unique, total)) = unique_line_ratio(text, t.ratio_min_lines)
            && (unique as f64) < (total as f64) * t.min_unique_line_ratio
        {
            return Some(SpamKind::LowUniqueRatio { unique, total });
        }

        let symbols = chars.iter().filter(|c| ASCII_ART_CHARS.contains(**c)).count();
        let ratio = symbols as f64 / chars.len() as f64;
        if ratio > t.max_symbol_ratio {
            return Some(SpamKind::SymbolDensity {
                percent: (ratio * 100.0).round() as u32,
            });
        }

        None
    }

    /// Character count, line count, and head/tail samples.
    pub fn digest(&self, text: &str) -> Digest {
        let sample = self.thresholds.digest_sample;
        Digest {
            char_count: text.chars().count(),
            line_count: text.matches('\n').count() + 1,
            head_sample: take_chars(text, sample),
            tail_sample: last_chars(text, sample),
        }
    }

    /// Sanitize text for display. `max_length` defaults to the output cap.
    pub fn sanitize(&self, text: &str, max_length: Option<usize>) -> SanitizedOutput {
        let max = max_length.unwrap_or(self.thresholds.output_cap);
        let original_length = text.chars().count();

        if let Some(detected) = self.detect_spam(text) {
            warn!(length = original_length, rule = %detected, "Output blocked as spam");
            let reason = GuardrailError::SpamDetected {
                reason: detected.to_string(),
            };
            return SanitizedOutput {
                visible_text: format!("[OUTPUT BLOCKED: {reason}]"),
                truncated: false,
                original_length,
                digest: Some(self.digest(text)),
                verdict: SanitizeVerdict::Spam { detected },
            };
        }

        let ceiling = self.thresholds.output_hard_ceiling;
        if original_length > ceiling {
            warn!(length = original_length, limit = ceiling, "Output rejected as oversize");
            let reason = GuardrailError::OversizeContent {
                what: "Output".into(),
                limit: ceiling,
                observed: original_length,
            };
            return SanitizedOutput {
                visible_text: format!("[OUTPUT REJECTED: {reason}]"),
                truncated: false,
                original_length,
                digest: Some(self.digest(text)),
                verdict: SanitizeVerdict::Oversize {
                    limit: ceiling,
                    observed: original_length,
                },
            };
        }

        if original_length <= max {
            return SanitizedOutput {
                visible_text: text.to_string(),
                truncated: false,
                original_length,
                digest: None,
                verdict: SanitizeVerdict::Clean,
            };
        }

        let elided = original_length - max;
        debug!(length = original_length, elided, "Output truncated");
        SanitizedOutput {
            visible_text: format!("{}{}", take_chars(text, max), truncation_marker(elided)),
            truncated: true,
            original_length,
            digest: Some(self.digest(text)),
            verdict: SanitizeVerdict::Truncated { elided },
        }
    }

    /// Visible text for terminal output at the output cap.
    pub fn sanitize_terminal_output(&self, text: &str) -> String {
        self.sanitize(text, None).visible_text
    }

    /// Truncate a diagnostic message at the diagnostic cap.
    pub fn sanitize_diagnostic(&self, message: &str) -> String {
        let cap = self.thresholds.diagnostic_cap;
        let length = message.chars().count();
        if length <= cap {
            return message.to_string();
        }
        format!(
            "{}... [TRUNCATED: {} more chars]",
            take_chars(message, cap),
            length - cap
        )
    }

    /// Bound file content for display, announcing when it was cut.
    pub fn sanitize_file_content(&self, content: &str) -> String {
        let cap = self.thresholds.file_content_cap;
        let length = content.chars().count();
        if length <= cap {
            return content.to_string();
        }
        format!(
            "[FILE TOO LARGE: {length} characters, exceeds {cap} limit. First {cap} chars shown]\n{}",
            take_chars(content, cap)
        )
    }

    /// Whether text must be rejected outright: spam first, then `max_length`.
    pub fn should_reject(&self, text: &str, max_length: usize) -> Result<(), GuardrailError> {
        if let Some(detected) = self.detect_spam(text) {
            return Err(GuardrailError::SpamDetected {
                reason: detected.to_string(),
            });
        }
        let observed = text.chars().count();
        if observed > max_length {
            return Err(GuardrailError::OversizeContent {
                what: "Output".into(),
                limit: max_length,
                observed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varied_lines(count: usize) -> String {
        (0..count)
            .map(|i| format!("line {i}: compiled module_{i} ok"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn short_text_passes_unmodified() {
        let t = Thresholds::default();
        let out = OutputSanitizer::new(&t).sanitize("hello\nworld", None);
        assert_eq!(out.visible_text, "hello\nworld");
        assert!(!out.truncated);
        assert_eq!(out.original_length, 11);
        assert_eq!(out.digest, None);
        assert_eq!(out.verdict, SanitizeVerdict::Clean);
    }

    #[test]
    fn empty_text_is_clean() {
        let t = Thresholds::default();
        let out = OutputSanitizer::new(&t).sanitize("", None);
        assert_eq!(out.visible_text, "");
        assert_eq!(out.verdict, SanitizeVerdict::Clean);
    }

    #[test]
    fn truncation_length_arithmetic() {
        let t = Thresholds::default();
        let s = OutputSanitizer::new(&t);
        let text = varied_lines(60);
        let len = text.chars().count();
        assert!(len > t.output_cap);

        let out = s.sanitize(&text, None);
        let elided = len - t.output_cap;
        assert!(out.truncated);
        assert_eq!(out.verdict, SanitizeVerdict::Truncated { elided });
        assert_eq!(
            out.visible_text.chars().count(),
            t.output_cap + truncation_marker(elided).chars().count()
        );
        assert!(out.visible_text.ends_with(&format!("[TRUNCATED: {elided} more characters]")));
        assert_eq!(out.digest.unwrap().char_count, len);
    }

    #[test]
    fn explicit_max_overrides_cap() {
        let t = Thresholds::default();
        let out = OutputSanitizer::new(&t).sanitize("abcdefghij", Some(4));
        assert!(out.visible_text.starts_with("abcd\n"));
        assert!(out.visible_text.contains("6 more characters"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let t = Thresholds::default();
        let out = OutputSanitizer::new(&t).sanitize("ééééé", Some(2));
        assert!(out.visible_text.starts_with("éé\n"));
        assert_eq!(out.original_length, 5);
    }

    #[test]
    fn sanitize_is_idempotent_within_bounds() {
        let t = Thresholds::default();
        let s = OutputSanitizer::new(&t);
        for text in ["", "ok", "a\nb\nc", &varied_lines(8)] {
            let once = s.sanitize(text, None);
            let twice = s.sanitize(&once.visible_text, None);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn single_char_repeated_is_spam_not_truncated() {
        let t = Thresholds::default();
        let out = OutputSanitizer::new(&t).sanitize(&"x".repeat(1000), None);
        assert!(out.is_rejected());
        assert!(!out.truncated);
        assert!(out.visible_text.starts_with("[OUTPUT BLOCKED: Spam detected"));
        assert!(!out.visible_text.contains(&"x".repeat(50)));
    }

    #[test]
    fn long_line_rule() {
        let t = Thresholds::default();
        let text = format!("{}\n{}", varied_lines(10), "word ".repeat(60));
        assert!(matches!(
            OutputSanitizer::new(&t).detect_spam(&text),
            Some(SpamKind::LongLine { line: 11, .. })
        ));
    }

    #[test]
    fn repeated_unit_rule() {
        let t = Thresholds::default();
        let text = format!("{}\n{}", varied_lines(10), "ab\n".repeat(120));
        match OutputSanitizer::new(&t).detect_spam(&text) {
            Some(SpamKind::RepeatedUnit { repeats, .. }) => assert!(repeats >= 100),
            other => panic!("expected repeated unit, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_padding_is_not_a_repeated_unit() {
        let chars: Vec<char> = format!("a{}b", " ".repeat(150)).chars().collect();
        assert_eq!(repeated_unit(&chars, 100), None);
    }

    #[test]
    fn separator_lines_below_threshold_pass() {
        let t = Thresholds::default();
        let text = format!("{}\n{}\n{}", "=".repeat(80), varied_lines(20), "=".repeat(80));
        assert_eq!(OutputSanitizer::new(&t).detect_spam(&text), None);
    }

    #[test]
    fn low_unique_ratio_rule() {
        let t = Thresholds::default();
        let text = "=== BANNER ===\n".repeat(60);
        assert!(matches!(
            OutputSanitizer::new(&t).detect_spam(&text),
            Some(SpamKind::LowUniqueRatio { unique: 2, .. })
        ));
    }

    #[test]
    fn symbol_density_rule() {
        let t = Thresholds::default();
        let text = (0..30)
            .map(|i| format!("{i:02} *.-|/#*.-|/#*.-|"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(matches!(
            OutputSanitizer::new(&t).detect_spam(&text),
            Some(SpamKind::SymbolDensity { .. })
        ));
    }

    #[test]
    fn short_text_never_spam() {
        let t = Thresholds::default();
        assert_eq!(OutputSanitizer::new(&t).detect_spam(&"#".repeat(300)), None);
    }

    #[test]
    fn oversize_output_rejected_with_digest() {
        let t = Thresholds::default();
        let text = varied_lines(3000);
        assert!(text.chars().count() > t.output_hard_ceiling);
        let out = OutputSanitizer::new(&t).sanitize(&text, None);
        assert!(out.is_rejected());
        assert!(matches!(out.verdict, SanitizeVerdict::Oversize { limit: 50_000, .. }));
        assert!(out.visible_text.contains("exceeds 50,000 limit"));
        let digest = out.digest.unwrap();
        assert_eq!(digest.line_count, 3000);
        assert!(digest.head_sample.starts_with("line 0:"));
        assert_eq!(digest.tail_sample.chars().count(), t.digest_sample);
    }

    #[test]
    fn diagnostic_and_file_content_caps() {
        let t = Thresholds::default();
        let s = OutputSanitizer::new(&t);
        let diag = s.sanitize_diagnostic(&"d".repeat(2010));
        assert!(diag.ends_with("... [TRUNCATED: 10 more chars]"));
        assert_eq!(s.sanitize_diagnostic("short"), "short");

        let file = s.sanitize_file_content(&"f".repeat(10_005));
        assert!(file.starts_with("[FILE TOO LARGE: 10005 characters, exceeds 10000 limit."));
    }

    #[test]
    fn should_reject_checks_spam_before_length() {
        let t = Thresholds::default();
        let s = OutputSanitizer::new(&t);
        assert!(matches!(
            s.should_reject(&"=".repeat(6000), 5000),
            Err(GuardrailError::SpamDetected { .. })
        ));
        assert!(matches!(
            s.should_reject(&varied_lines(300), 5000),
            Err(GuardrailError::OversizeContent { limit: 5000, .. })
        ));
        assert!(s.should_reject("fine", 5000).is_ok());
    }

    #[test]
    fn wrap_uses_delimiters() {
        let both = wrap_command_output("out", "err");
        assert!(both.starts_with("<terminal_output begin>\nSTDOUT:\nout"));
        assert!(both.contains("STDERR:\nerr"));
        assert!(both.ends_with("<terminal_output end>"));
        assert!(!wrap_command_output("", "err").contains("STDOUT"));
        assert_eq!(wrap_command_output("", ""), "(No output)");
    }
}
