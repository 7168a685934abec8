//! Built-in command handlers.

use super::inbox::InboxGuard;
use super::Gateway;
use crate::commands::{format_status, Command, StatusSnapshot};
use courier_core::{
    config::{shellexpand, BackendKind},
    message::{IncomingMessage, Notification},
};
use courier_providers::process::run_bounded;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command as ProcessCommand;
use tracing::{info, warn};
use uuid::Uuid;

/// Screenshot tools print little; anything larger is a misbehaving tool.
const SCREENSHOT_MAX_OUTPUT: usize = 1024 * 1024;

impl Gateway {
    pub(super) async fn handle_command(&self, cmd: Command, incoming: &IncomingMessage) {
        info!("[{}] command: {cmd:?}", incoming.channel);
        match cmd {
            Command::SwitchProvider(kind) => self.handle_switch(kind, incoming).await,
            Command::Status => {
                let text = self.status_text(incoming).await;
                self.send_text(incoming, &text).await;
            }
            Command::Clear => {
                self.conversations
                    .lock()
                    .await
                    .clear(&incoming.session_key());
                self.send_text(incoming, "Conversation cleared.").await;
            }
            Command::SendFile(path) => self.handle_send(&path, incoming).await,
            Command::Screenshot(url) => self.handle_screenshot(&url, incoming).await,
            Command::QueueStart {
                folder,
                interval_secs,
            } => {
                self.handle_queue_start(&folder, interval_secs, incoming)
                    .await
            }
            Command::QueueStatus => {
                let text = self.queue.status().await.describe();
                self.send_text(incoming, &text).await;
            }
            Command::QueueStop => {
                let text = match self.queue.stop().await {
                    Some(snap) => format!(
                        "Queue stopped: {}/{} files sent.",
                        snap.sent_files, snap.total_files
                    ),
                    None => "No active queue.".to_string(),
                };
                self.send_text(incoming, &text).await;
            }
            // Prompts never reach the command handler.
            Command::FreeformPrompt(_) => {}
        }
    }

    async fn handle_switch(&self, kind: BackendKind, incoming: &IncomingMessage) {
        if !self.backends.contains_key(&kind) {
            self.report_error(incoming, &format!("{} is not configured.", kind.display_name()))
                .await;
            return;
        }
        *self.current.lock().await = kind;
        info!("switched backend to {kind}");
        self.notifier.emit(Notification::ProviderSwitched {
            backend: kind.name().to_string(),
        });
        self.send_text(incoming, &format!("Switched to {}.", kind.display_name()))
            .await;
    }

    async fn status_text(&self, incoming: &IncomingMessage) -> String {
        let backend = *self.current.lock().await;
        let session = incoming.session_key();
        let history_len = self
            .conversations
            .lock()
            .await
            .history(&session, backend.name())
            .len();
        let round_in_flight = self.round_in_flight(&session).await;
        // Peek without consuming the one-shot report of a finished run.
        let queue = self.queue.peek().await;

        format_status(&StatusSnapshot {
            backend,
            history_len,
            round_in_flight,
            queue_active: queue.active,
            queue_sent: queue.sent_files,
            queue_total: queue.total_files,
            uptime: self.uptime.elapsed(),
        })
    }

    async fn handle_send(&self, raw_path: &str, incoming: &IncomingMessage) {
        let path = PathBuf::from(shellexpand(raw_path));
        if !path.exists() {
            self.send_text(incoming, &format!("File not found: {}", path.display()))
                .await;
            return;
        }
        if !path.is_file() {
            self.send_text(incoming, &format!("Not a file: {}", path.display()))
                .await;
            return;
        }

        let caption = file_caption(&path);
        if let Err(e) = self.send_media(incoming, &path, &caption).await {
            warn!("send {} failed: {e}", path.display());
            self.report_error(incoming, &format!("Could not send {}: {e}", path.display()))
                .await;
        }
    }

    async fn handle_screenshot(&self, url: &str, incoming: &IncomingMessage) {
        if !self.screenshot.is_configured() {
            self.send_text(
                incoming,
                "Screenshots are not configured. Set [screenshot] command in config.toml.",
            )
            .await;
            return;
        }

        let dir = self.data_dir.join("screenshots");
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            self.report_error(incoming, &format!("Screenshot failed: {e}"))
                .await;
            return;
        }
        let output = dir.join(format!("{}.png", Uuid::new_v4()));
        // Scratch file: gone once this handler returns.
        let _cleanup = InboxGuard::new(vec![output.clone()]);

        let mut cmd = ProcessCommand::new(&self.screenshot.command);
        cmd.args(self.screenshot.render_args(url, &output))
            .stdin(std::process::Stdio::null());
        let timeout = Duration::from_secs(self.screenshot.timeout_secs);

        let failure = match run_bounded(cmd, "screenshot", timeout, SCREENSHOT_MAX_OUTPUT).await {
            Ok(out) if out.success && output.is_file() => None,
            Ok(out) => Some(if out.stderr.trim().is_empty() {
                format!("tool exited with {:?}", out.code)
            } else {
                out.stderr.trim().to_string()
            }),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            warn!("screenshot of {url} failed: {reason}");
            self.report_error(incoming, &format!("Screenshot failed: {reason}"))
                .await;
            return;
        }

        info!("screenshot of {url} saved to {}", output.display());
        if let Err(e) = self.send_media(incoming, &output, url).await {
            self.report_error(incoming, &format!("Could not send screenshot: {e}"))
                .await;
        }
    }

    async fn handle_queue_start(&self, folder: &str, interval_secs: u64, incoming: &IncomingMessage) {
        let Some(channel) = self.channel_for(incoming) else {
            warn!("[{}] queue not started: unknown channel", incoming.channel);
            self.notifier.emit(Notification::Error {
                message: format!("Queue not started: unknown channel {}", incoming.channel),
            });
            return;
        };
        let folder = PathBuf::from(shellexpand(folder));
        let started = self
            .queue
            .start(
                &folder,
                Duration::from_secs(interval_secs),
                channel,
                Self::target_of(incoming),
            )
            .await;

        match started {
            Ok(snap) => {
                let text = if snap.active {
                    format!(
                        "Queue started: {} files from {} every {interval_secs}s ({} sent).",
                        snap.total_files,
                        folder.display(),
                        snap.sent_files
                    )
                } else {
                    format!("Queue finished: {}/{} files sent.", snap.sent_files, snap.total_files)
                };
                self.send_text(incoming, &text).await;
            }
            Err(e) => {
                warn!("queue start failed: {e}");
                self.send_text(incoming, &format!("Queue not started: {e}"))
                    .await;
            }
        }
    }
}

fn file_caption(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
