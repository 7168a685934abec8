//! Read loop and Channel trait implementation.

use super::input::parse_line;
use super::ConsoleChannel;
use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    message::{IncomingMessage, Presence},
    traits::Channel,
};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const NAME: &str = "console";

impl ConsoleChannel {
    async fn write_line(&self, line: &str) -> Result<(), CourierError> {
        let mut out = self.output.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, CourierError> {
        let mut lines = self
            .input
            .lock()
            .await
            .take()
            .ok_or_else(|| CourierError::Channel("console input already consumed".into()))?
            .lines();

        let (tx, rx) = mpsc::channel(64);
        let target = self.config.target.clone();
        let output = self.output.clone();
        let shutdown = self.shutdown.clone();

        info!("[{NAME}] reading messages from stdin (target {target})");

        tokio::spawn(async move {
            loop {
                let line = tokio::select! {
                    _ = shutdown.notified() => break,
                    line = lines.next_line() => line,
                };
                let line = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => {
                        info!("[{NAME}] input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("[{NAME}] read error: {e}");
                        break;
                    }
                };

                match parse_line(NAME, &target, &line).await {
                    Ok(Some(msg)) => {
                        debug!("[{NAME}] inbound {} ({} attachments)", msg.id, msg.attachments.len());
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("[{NAME}] {e}");
                        let mut out = output.lock().await;
                        let _ = out.write_all(format!("[error] {e}\n").as_bytes()).await;
                        let _ = out.flush().await;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send_text(&self, _target: &str, text: &str) -> Result<(), CourierError> {
        self.write_line(text).await
    }

    async fn send_media(
        &self,
        _target: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), CourierError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| CourierError::Delivery(format!("{}: {e}", path.display())))?;
        if !meta.is_file() {
            return Err(CourierError::Delivery(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let line = if caption.is_empty() {
            format!("[media] {}", path.display())
        } else {
            format!("[media] {} | {caption}", path.display())
        };
        self.write_line(&line).await
    }

    async fn send_presence(&self, _target: &str, presence: Presence) -> Result<(), CourierError> {
        match presence {
            Presence::Composing => self.write_line("[composing]").await,
            Presence::Paused => self.write_line("[paused]").await,
        }
    }

    async fn stop(&self) -> Result<(), CourierError> {
        info!("[{NAME}] stopping");
        self.shutdown.notify_one();
        Ok(())
    }
}
