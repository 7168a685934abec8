//! Batch CLI backend.
//!
//! Runs the configured AI CLI once per prompt and waits for it to exit.
//! Relies on the CLI's own local authentication; no API keys are handled here.

mod provider;
mod response;

#[cfg(test)]
mod tests;

use courier_core::config::CliConfig;
use std::time::Duration;
use tokio::process::Command;

pub(crate) use response::classify_output;

/// Batch CLI backend configuration.
pub struct BatchBackend {
    /// Backend name used in logs, history keys, and diagnostics.
    name: String,
    cli: CliConfig,
    /// Subprocess timeout.
    timeout: Duration,
}

impl BatchBackend {
    /// Create a backend from config values.
    pub fn from_config(name: &str, cli: CliConfig) -> Self {
        Self {
            name: name.to_string(),
            timeout: Duration::from_secs(cli.timeout_secs),
            cli,
        }
    }

    /// Check if the CLI is installed and accessible.
    pub async fn check_cli(command: &str) -> bool {
        Command::new(command)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
