//! `agentguard config` — print the effective configuration.

use agentguard_config::GuardrailConfig;
use std::process::ExitCode;

pub fn show(config: &GuardrailConfig) -> anyhow::Result<ExitCode> {
    print!("{}", config.to_toml());
    Ok(ExitCode::SUCCESS)
}
