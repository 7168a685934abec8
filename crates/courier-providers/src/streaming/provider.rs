//! Backend trait implementation: collects a stream into one reply.

use super::{StreamEvent, StreamSource, StreamingBackend};
use crate::batch::{classify_output, BatchBackend};
use crate::process::CapturedOutput;
use async_trait::async_trait;
use courier_core::{error::CourierError, message::BackendReply, traits::Backend};
use std::time::Instant;
use tracing::{debug, info};

#[async_trait]
impl Backend for StreamingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<BackendReply, CourierError> {
        let start = Instant::now();
        debug!("[{}] streaming: {} <prompt>", self.name, self.cli.command);

        let mut handle = self.stream(prompt);
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut done = false;

        while let Some(event) = handle.events.recv().await {
            match event {
                StreamEvent::Chunk { source, text } => {
                    debug!("[{}] {:?} chunk: {} bytes", self.name, source, text.len());
                    match source {
                        StreamSource::Stdout => stdout.push_str(&text),
                        StreamSource::Stderr => stderr.push_str(&text),
                    }
                }
                StreamEvent::Done => {
                    done = true;
                    break;
                }
            }
        }

        let exit = match handle.status.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CourierError::Backend(format!(
                    "{}: stream ended without status",
                    self.name
                )))
            }
        };
        if !done {
            return Err(CourierError::Backend(format!(
                "{}: stream closed before completion",
                self.name
            )));
        }

        let output = CapturedOutput {
            stdout,
            stderr,
            success: exit.success,
            code: exit.code,
        };
        let (text, outcome) = classify_output(&self.name, &self.cli.command, &output);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "[{}] stream finished | outcome: {:?} | exit: {:?} | {}ms",
            self.name, outcome, exit.code, elapsed_ms
        );

        Ok(BackendReply {
            text,
            outcome,
            backend: self.name.clone(),
            processing_time_ms: elapsed_ms,
        })
    }

    async fn is_available(&self) -> bool {
        BatchBackend::check_cli(&self.cli.command).await
    }
}
