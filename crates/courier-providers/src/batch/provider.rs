//! Backend trait implementation.

use super::{classify_output, BatchBackend};
use crate::process::{cli_command, run_bounded};
use async_trait::async_trait;
use courier_core::{error::CourierError, message::BackendReply, traits::Backend};
use std::time::Instant;
use tracing::{debug, info};

#[async_trait]
impl Backend for BatchBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<BackendReply, CourierError> {
        let start = Instant::now();
        let cmd = cli_command(&self.cli, prompt);
        debug!("[{}] executing: {} <prompt>", self.name, self.cli.command);

        let output = run_bounded(cmd, &self.name, self.timeout, self.cli.max_output_bytes).await?;
        let (text, outcome) = classify_output(&self.name, &self.cli.command, &output);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "[{}] finished | outcome: {:?} | exit: {:?} | {}ms",
            self.name, outcome, output.code, elapsed_ms
        );

        Ok(BackendReply {
            text,
            outcome,
            backend: self.name.clone(),
            processing_time_ms: elapsed_ms,
        })
    }

    async fn is_available(&self) -> bool {
        Self::check_cli(&self.cli.command).await
    }
}
