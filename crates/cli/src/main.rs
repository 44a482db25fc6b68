//! AgentGuard CLI — run any guardrail from the command line.
//!
//! Commands:
//! - `check`          — classify a command and apply the confirmation gate
//! - `sanitize`       — bound and inspect text from a file or stdin
//! - `validate-edit`  — validate proposed file content
//! - `veto`           — screen an inbound request
//! - `config`         — print the effective configuration

use agentguard_config::GuardrailConfig;
use agentguard_security::{AuditLogger, TracingSink};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands {
    pub mod check;
    pub mod config_cmd;
    pub mod edit;
    pub mod sanitize;
    pub mod veto;
}

/// Exit status when a check rejects its input.
pub(crate) const EXIT_REJECTED: u8 = 3;

#[derive(Parser)]
#[command(
    name = "agentguard",
    about = "AgentGuard — guardrails for autonomous coding agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $AGENTGUARD_CONFIG or ./agentguard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a command: exit 0 allow, 2 needs confirmation, 3 blocked
    Check {
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,

        /// The command and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Sanitize text for display (reads stdin without FILE)
    Sanitize {
        file: Option<PathBuf>,

        /// Display cap in characters (default: configured output cap)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Validate proposed file content before it is written
    ValidateEdit {
        file: PathBuf,

        /// `edit` or `overwrite`
        #[arg(long, default_value = "edit")]
        op: String,
    },

    /// Screen an inbound request (reads stdin without TEXT)
    Veto { text: Option<String> },

    /// Print the effective configuration as TOML
    Config,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GuardrailConfig> {
    let config = match path {
        Some(path) => {
            let config = GuardrailConfig::load_from(path)?;
            config.validate()?;
            config
        }
        None => GuardrailConfig::load()?,
    };
    Ok(config)
}

pub(crate) fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin"),
    }
}

/// Every decision the CLI makes is also emitted as an `AUDIT` log line.
fn audit_logger() -> AuditLogger {
    AuditLogger::with_sinks(vec![Box::new(TracingSink)])
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // audit lines are always shown
    let filter = if cli.verbose { "debug" } else { "warn,audit=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(
        path = ?cli.config,
        output_cap = config.thresholds.output_cap,
        "Configuration loaded"
    );
    let audit = audit_logger();

    match cli.command {
        Commands::Check { json, command } => commands::check::run(&config, &audit, &command, json),
        Commands::Sanitize { file, max } => {
            commands::sanitize::run(&config, &audit, file.as_ref(), max)
        }
        Commands::ValidateEdit { file, op } => commands::edit::run(&config, &audit, &file, &op),
        Commands::Veto { text } => commands::veto::run(&config, &audit, text),
        Commands::Config => commands::config_cmd::show(&config),
    }
}
