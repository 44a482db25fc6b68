//! Command risk classification — allow, confirm, or block a tokenized command.
//!
//! Rules are evaluated in order and the first match wins:
//! 1. Any chaining operator (`&&`, `||`, `;`) → block
//! 2. Destructive system verb (format, mkfs, shutdown, ...) → block
//! 3. File-mutating or dependency-installing verb → confirm
//! 4. Anything else → allow
//!
//! Verbs are compared as whole, normalized tokens: `format-date` is not `format`.
//! The verb is the command that actually runs, so wrappers (`sudo`, `env`,
//! `nice -n 10`, `timeout 30s`, ...), their options and leading `NAME=value`
//! assignments are skipped first.

use agentguard_config::CommandPolicyConfig;
use agentguard_core::CommandAssessment;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Operators that sequence or condition several commands.
pub const CHAIN_OPERATORS: [&str; 3] = ["&&", "||", ";"];

const DESTRUCTIVE_VERBS: &[&str] = &[
    "format", "diskpart", "fdisk", "parted", "mkfs", "shutdown", "reboot", "halt", "poweroff",
];

const FILE_MUTATION_VERBS: &[&str] = &[
    "rm", "rmdir", "del", "erase", "mv", "move", "ren", "rename", "chmod", "chown", "attrib",
    "xcopy", "robocopy", "rsync",
];

const INSTALLER_VERBS: &[&str] = &[
    "pip", "pip3", "npm", "yarn", "pnpm", "conda", "poetry", "uv", "gem", "apt", "apt-get",
    "brew", "choco", "winget",
];

/// Commands that run another command, with the options that take a value.
const WRAPPER_VERBS: &[(&str, &[&str])] = &[
    ("sudo", &["-u", "-g", "-C", "-D", "-h", "-p", "-r", "-t", "-U"]),
    ("doas", &["-u", "-C"]),
    ("env", &["-u", "-C", "-S"]),
    ("nice", &["-n"]),
    ("nohup", &[]),
    ("time", &["-f", "-o"]),
    ("command", &[]),
    ("exec", &["-a"]),
    ("stdbuf", &["-i", "-o", "-e"]),
    ("timeout", &["-s", "-k"]),
];

/// Failure to turn raw command text into argv.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("No executable provided")]
    Empty,

    #[error("Unable to parse command: {0}")]
    Malformed(String),
}

/// Split command text into argv using POSIX shell-word rules.
pub fn parse_command_text(text: &str) -> Result<Vec<String>, CommandParseError> {
    let argv = shell_words::split(text).map_err(|e| CommandParseError::Malformed(e.to_string()))?;
    if argv.is_empty() {
        return Err(CommandParseError::Empty);
    }
    Ok(argv)
}

/// True if any token contains a chaining operator.
pub fn has_chaining<S: AsRef<str>>(argv: &[S]) -> bool {
    argv.iter()
        .any(|token| CHAIN_OPERATORS.iter().any(|op| token.as_ref().contains(op)))
}

/// Normalize a primary verb: lowercase, no directory, no extension.
///
/// `/usr/sbin/mkfs.ext4` → `mkfs`, `C:\Windows\System32\format.com` → `format`.
pub fn normalize_verb(token: &str) -> String {
    let lowered = token.trim().to_lowercase();
    let name = lowered
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(lowered.as_str());
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

fn wrapper_options(verb: &str) -> Option<&'static [&'static str]> {
    WRAPPER_VERBS
        .iter()
        .find(|(wrapper, _)| *wrapper == verb)
        .map(|(_, options)| *options)
}

/// `NAME=value` as the shell and `env` read it.
fn is_assignment(token: &str) -> bool {
    token.split_once('=').is_some_and(|(name, _)| {
        !name.is_empty()
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// The normalized verb that actually runs, past any wrappers.
///
/// `sudo -u root mkfs /dev/sda` → `mkfs`, `FOO=1 env -i rm x` → `rm`.
/// A command made only of wrappers yields the last wrapper.
pub fn primary_verb<S: AsRef<str>>(argv: &[S]) -> Option<String> {
    let mut tokens = argv.iter().map(AsRef::as_ref).peekable();
    let mut last_wrapper = None;

    while let Some(token) = tokens.next() {
        if is_assignment(token) {
            continue;
        }
        let verb = normalize_verb(token);
        let Some(options) = wrapper_options(&verb) else {
            return Some(verb);
        };

        while let Some(&next) = tokens.peek() {
            if options.contains(&next) {
                tokens.next();
                tokens.next();
            } else if next.starts_with('-') || (verb == "env" && is_assignment(next)) {
                tokens.next();
            } else if verb == "timeout" && next.starts_with(|c: char| c.is_ascii_digit()) {
                // the duration comes last
                tokens.next();
                break;
            } else {
                break;
            }
        }
        last_wrapper = Some(verb);
    }
    last_wrapper
}

/// Classifies tokenized commands. Holds only read-only verb sets.
#[derive(Debug, Clone)]
pub struct CommandRiskClassifier {
    destructive: HashSet<String>,
    file_mutation: HashSet<String>,
    installers: HashSet<String>,
}

impl Default for CommandRiskClassifier {
    fn default() -> Self {
        Self::new(&CommandPolicyConfig::default())
    }
}

impl CommandRiskClassifier {
    /// Build the classifier from the built-in sets plus any configured extras.
    pub fn new(policy: &CommandPolicyConfig) -> Self {
        fn build(builtin: &[&str], extra: &[String]) -> HashSet<String> {
            builtin
                .iter()
                .map(|v| v.to_string())
                .chain(extra.iter().map(|v| normalize_verb(v)))
                .collect()
        }

        Self {
            destructive: build(DESTRUCTIVE_VERBS, &policy.extra_blocked),
            file_mutation: build(FILE_MUTATION_VERBS, &policy.extra_file_mutation),
            installers: build(INSTALLER_VERBS, &policy.extra_installers),
        }
    }

    /// Assess a tokenized command.
    pub fn assess<S: AsRef<str>>(&self, argv: &[S]) -> CommandAssessment {
        let Some(first) = argv.first() else {
            return CommandAssessment::allow("no command provided (no-op)");
        };

        if has_chaining(argv) {
            warn!(verb = %first.as_ref(), "Blocked chained command");
            return CommandAssessment::block("command chaining detected");
        }

        let verb = primary_verb(argv).unwrap_or_else(|| normalize_verb(first.as_ref()));

        if self.destructive.contains(&verb) {
            warn!(verb = %verb, "Blocked destructive command");
            return CommandAssessment::block(format!("'{verb}' is a destructive system command"));
        }

        if self.file_mutation.contains(&verb) {
            debug!(verb = %verb, "Command requires confirmation");
            return CommandAssessment::confirm(format!("'{verb}' modifies files"));
        }

        if self.installers.contains(&verb) {
            debug!(verb = %verb, "Command requires confirmation");
            return CommandAssessment::confirm(format!("'{verb}' installs dependencies"));
        }

        debug!(verb = %verb, "Command allowed");
        CommandAssessment::allow("no risky capability detected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentguard_core::CommandStatus;

    fn argv(text: &str) -> Vec<String> {
        parse_command_text(text).unwrap()
    }

    fn status(text: &str) -> CommandStatus {
        CommandRiskClassifier::default().assess(&argv(text)).status
    }

    #[test]
    fn chaining_always_blocks() {
        for cmd in [
            "git pull && npm install",
            "ls || rm -rf /",
            "echo hi ; reboot",
            "git status;",
            "ls &&echo",
        ] {
            let a = CommandRiskClassifier::default().assess(&argv(cmd));
            assert_eq!(a.status, CommandStatus::Block, "{cmd}");
            assert_eq!(a.reason, "command chaining detected");
        }
    }

    #[test]
    fn chaining_beats_confirm_verbs() {
        // `rm` alone would only need confirmation
        assert_eq!(status("rm a.txt ; ls"), CommandStatus::Block);
    }

    #[test]
    fn destructive_verbs_block() {
        for cmd in ["format C:", "mkfs.ext4 /dev/sda1", "shutdown -h now", "reboot", "diskpart"] {
            assert_eq!(status(cmd), CommandStatus::Block, "{cmd}");
        }
    }

    #[test]
    fn file_mutation_requires_confirm() {
        let a = CommandRiskClassifier::default().assess(&argv("rm -rf old_data"));
        assert_eq!(a.status, CommandStatus::Confirm);
        assert_eq!(a.reason, "'rm' modifies files");
        assert_eq!(status("chmod 755 run.sh"), CommandStatus::Confirm);
        assert_eq!(status("mv a b"), CommandStatus::Confirm);
    }

    #[test]
    fn installers_require_confirm() {
        let a = CommandRiskClassifier::default().assess(&argv("pip install requests"));
        assert_eq!(a.status, CommandStatus::Confirm);
        assert!(a.reason.contains("installs dependencies"));
        assert_eq!(status("npm install"), CommandStatus::Confirm);
    }

    #[test]
    fn ordinary_commands_allowed() {
        assert_eq!(status("git status"), CommandStatus::Allow);
        assert_eq!(status("ls -la"), CommandStatus::Allow);
        assert_eq!(status("cargo test"), CommandStatus::Allow);
    }

    #[test]
    fn empty_argv_is_noop_allow() {
        let empty: Vec<String> = vec![];
        let a = CommandRiskClassifier::default().assess(&empty);
        assert_eq!(a.status, CommandStatus::Allow);
    }

    #[test]
    fn whole_token_matching_only() {
        assert_eq!(status("format-date --iso"), CommandStatus::Allow);
        assert_eq!(status("rmate notes.txt"), CommandStatus::Allow);
        assert_eq!(status("pipx list"), CommandStatus::Allow);
    }

    #[test]
    fn verb_normalization_strips_case_path_and_extension() {
        assert_eq!(normalize_verb("RM"), "rm");
        assert_eq!(normalize_verb("/bin/rm"), "rm");
        assert_eq!(normalize_verb(r"C:\Windows\System32\format.com"), "format");
        assert_eq!(normalize_verb("mkfs.ext4"), "mkfs");
        assert_eq!(normalize_verb(".hidden"), ".hidden");
        assert_eq!(status("/sbin/SHUTDOWN now"), CommandStatus::Block);
        assert_eq!(status("pip.exe install x"), CommandStatus::Confirm);
    }

    #[test]
    fn wrappers_do_not_hide_the_real_verb() {
        let a = CommandRiskClassifier::default().assess(&argv("sudo mkfs /dev/sda"));
        assert_eq!(a.status, CommandStatus::Block);
        assert_eq!(a.reason, "'mkfs' is a destructive system command");

        assert_eq!(status("env rm -rf x"), CommandStatus::Confirm);
        assert_eq!(status("nice -n 10 npm install"), CommandStatus::Confirm);
        assert_eq!(status("sudo -u root /sbin/reboot"), CommandStatus::Block);
        assert_eq!(status("timeout -s KILL 30s rm -rf build"), CommandStatus::Confirm);
        assert_eq!(status("env -i PATH=/bin FOO=1 shutdown now"), CommandStatus::Block);
        assert_eq!(status("DEBUG=1 nohup rm log.txt"), CommandStatus::Confirm);
        assert_eq!(status("sudo git status"), CommandStatus::Allow);
    }

    #[test]
    fn primary_verb_edge_cases() {
        assert_eq!(primary_verb(&["sudo"]).as_deref(), Some("sudo"));
        assert_eq!(primary_verb(&["sudo", "-E"]).as_deref(), Some("sudo"));
        assert_eq!(primary_verb(&["FOO=1"]), None);
        assert_eq!(primary_verb(&["rm", "a=b"]).as_deref(), Some("rm"));
        assert_eq!(primary_verb(&["time", "sudo", "doas", "RM"]).as_deref(), Some("rm"));
        assert_eq!(status("sudo"), CommandStatus::Allow);
        assert_eq!(status("FOO=1"), CommandStatus::Allow);
    }

    #[test]
    fn configured_extras_extend_sets() {
        let policy = CommandPolicyConfig {
            extra_blocked: vec!["dd".into()],
            extra_file_mutation: vec!["truncate".into()],
            extra_installers: vec!["Cargo-Binstall".into()],
        };
        let classifier = CommandRiskClassifier::new(&policy);
        assert_eq!(classifier.assess(&["dd", "if=/dev/zero"]).status, CommandStatus::Block);
        assert_eq!(classifier.assess(&["truncate", "-s0", "f"]).status, CommandStatus::Confirm);
        assert_eq!(classifier.assess(&["cargo-binstall", "x"]).status, CommandStatus::Confirm);
        // built-ins survive
        assert_eq!(classifier.assess(&["reboot"]).status, CommandStatus::Block);
    }

    #[test]
    fn parse_rejects_empty_and_unbalanced() {
        assert_eq!(parse_command_text("   "), Err(CommandParseError::Empty));
        assert!(matches!(
            parse_command_text("echo 'unterminated"),
            Err(CommandParseError::Malformed(_))
        ));
        assert_eq!(argv("echo 'a b' c"), vec!["echo", "a b", "c"]);
    }
}
