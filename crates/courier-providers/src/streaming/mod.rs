//! Streaming CLI backend.
//!
//! Spawns the configured CLI for one prompt and forwards its stdout and
//! stderr incrementally. Failures to start (and resource-limit breaches) are
//! reported on a separate status channel and never appear as chunks.

mod provider;
mod pump;

#[cfg(test)]
mod tests;

use courier_core::{config::CliConfig, error::CourierError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Which pipe a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Incremental output events, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of output; more may follow.
    Chunk { source: StreamSource, text: String },
    /// The process exited. Always the last event.
    Done,
}

/// How the process exited, resolved just before `Done` is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub success: bool,
    pub code: Option<i32>,
}

/// Receivers for one streaming run.
pub struct StreamHandle {
    /// Chunk/done signalling.
    pub events: mpsc::Receiver<StreamEvent>,
    /// Exit status, or the error that prevented a normal exit.
    pub status: oneshot::Receiver<Result<ProcessExit, CourierError>>,
}

/// Streaming CLI backend configuration.
pub struct StreamingBackend {
    name: String,
    cli: CliConfig,
    timeout: Duration,
}

impl StreamingBackend {
    /// Create a backend from config values.
    pub fn from_config(name: &str, cli: CliConfig) -> Self {
        Self {
            name: name.to_string(),
            timeout: Duration::from_secs(cli.timeout_secs),
            cli,
        }
    }

    /// Start one streaming run. Never fails synchronously: a spawn error
    /// arrives on `status` and `events` closes without `Done`.
    pub fn stream(&self, prompt: &str) -> StreamHandle {
        let (event_tx, events) = mpsc::channel(64);
        let (status_tx, status) = oneshot::channel();
        let cmd = crate::process::cli_command(&self.cli, prompt);
        let name = self.name.clone();
        let timeout = self.timeout;
        let cap = self.cli.max_output_bytes;

        tokio::spawn(async move {
            let result = pump::run(cmd, &name, timeout, cap, event_tx.clone()).await;
            let finished = result.is_ok();
            let _ = status_tx.send(result);
            if finished {
                let _ = event_tx.send(StreamEvent::Done).await;
            }
        });

        StreamHandle { events, status }
    }
}
