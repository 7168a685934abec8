//! Gateway: the event loop connecting the self-channel, the backends, and the
//! file queue.
//!
//! Built-in commands are answered immediately. AI rounds are serialized per
//! session: a prompt that arrives while a round is open is buffered and
//! handled once the current round finishes.

mod inbox;
pub mod notifier;
mod pipeline;
pub mod presence;
pub mod queue;
mod routing;


use crate::commands::Command;
use courier_core::{
    config::{BackendKind, Config, ScreenshotConfig},
    context::ConversationStore,
    error::CourierError,
    message::{IncomingMessage, Notification},
    traits::{Backend, Channel},
};
use notifier::Notifier;
use queue::FileQueue;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// The central gateway that routes self-channel messages.
pub struct Gateway {
    pub(super) backends: HashMap<BackendKind, Arc<dyn Backend>>,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    /// Backend that receives the next prompt.
    pub(super) current: Mutex<BackendKind>,
    pub(super) conversations: Mutex<ConversationStore>,
    pub(super) queue: FileQueue,
    pub(super) notifier: Notifier,
    /// Sessions with an AI round in progress. Prompts arriving meanwhile are buffered here.
    pub(super) active_sessions: Mutex<HashMap<String, VecDeque<IncomingMessage>>>,
    pub(super) presence_interval: Duration,
    pub(super) queue_default_interval_secs: u64,
    pub(super) screenshot: ScreenshotConfig,
    pub(super) data_dir: PathBuf,
    pub(super) uptime: Instant,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        config: &Config,
        backends: HashMap<BackendKind, Arc<dyn Backend>>,
        channels: HashMap<String, Arc<dyn Channel>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            backends,
            channels,
            current: Mutex::new(config.backend.default),
            conversations: Mutex::new(ConversationStore::new()),
            queue: FileQueue::new(config.queue.max_attempts, notifier.clone()),
            notifier,
            active_sessions: Mutex::new(HashMap::new()),
            presence_interval: Duration::from_secs(config.presence.interval_secs.max(1)),
            queue_default_interval_secs: config.queue.default_interval_secs,
            screenshot: config.screenshot.clone(),
            data_dir: config.courier.data_path(),
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the main event loop until `shutdown` resolves.
    ///
    /// Closed input does not end the loop: rounds in progress, buffered
    /// prompts and queue deliveries keep running until shutdown.
    pub(crate) async fn run_until(
        self: Arc<Self>,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> anyhow::Result<()> {
        info!(
            "Courier gateway running | backend: {} | channels: {}",
            *self.current.lock().await,
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
        );

        inbox::purge_inbox(&self.data_dir);

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
                info!("{channel_name} input closed");
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch_message(incoming).await;
                    });
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Route one inbound message: commands run now, prompts go through the
    /// per-session gate.
    pub(crate) async fn dispatch_message(self: Arc<Self>, incoming: IncomingMessage) {
        if !incoming.from_self {
            debug!(
                "[{}] ignoring message from {} (not self-channel)",
                incoming.channel, incoming.sender_id
            );
            return;
        }

        let parsed = Command::parse(
            &incoming.text,
            incoming.has_media(),
            self.queue_default_interval_secs,
        );
        match parsed {
            Ok(Some(cmd)) if cmd.is_builtin() => {
                self.handle_command(cmd, &incoming).await;
                return;
            }
            Ok(Some(_)) => {}
            Ok(None) if incoming.has_media() => {}
            Ok(None) => return,
            Err(CourierError::Usage(usage)) => {
                self.send_text(&incoming, &format!("Usage: {usage}")).await;
                return;
            }
            Err(e) => {
                self.report_error(&incoming, &e.to_string()).await;
                return;
            }
        }

        let session = incoming.session_key();
        {
            let mut active = self.active_sessions.lock().await;
            if let Some(buffer) = active.get_mut(&session) {
                buffer.push_back(incoming.clone());
                info!("buffered message for {session} (AI round in progress)");
                drop(active);
                self.send_text(&incoming, "Queued: I'll get to this after the current reply.")
                    .await;
                return;
            }
            active.insert(session.clone(), VecDeque::new());
        }

        self.handle_message(incoming).await;

        loop {
            let next = {
                let mut active = self.active_sessions.lock().await;
                match active.get_mut(&session).and_then(VecDeque::pop_front) {
                    Some(msg) => Some(msg),
                    None => {
                        active.remove(&session);
                        None
                    }
                }
            };

            match next {
                Some(buffered) => {
                    info!("processing buffered message for {session}");
                    self.handle_message(buffered).await;
                }
                None => break,
            }
        }
    }

    /// Whether an AI round is open for the session.
    pub(super) async fn round_in_flight(&self, session: &str) -> bool {
        self.conversations.lock().await.is_open(session)
    }

    async fn shutdown(&self) {
        info!("Shutting down...");

        if self.queue.stop().await.is_some() {
            info!("queue stopped for shutdown");
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!("Shutdown complete.");
    }

    pub(super) fn channel_for(&self, incoming: &IncomingMessage) -> Option<Arc<dyn Channel>> {
        self.channels.get(&incoming.channel).cloned()
    }

    /// Reply target for a message.
    pub(super) fn target_of(incoming: &IncomingMessage) -> &str {
        incoming
            .reply_target
            .as_deref()
            .unwrap_or(&incoming.sender_id)
    }

    /// Send a plain text message back to the self-channel.
    pub(super) async fn send_text(&self, incoming: &IncomingMessage, text: &str) {
        if let Some(channel) = self.channel_for(incoming) {
            if let Err(e) = channel.send_text(Self::target_of(incoming), text).await {
                error!("failed to send message: {e}");
            }
        }
    }

    /// Send a file back to the self-channel.
    pub(super) async fn send_media(
        &self,
        incoming: &IncomingMessage,
        path: &Path,
        caption: &str,
    ) -> Result<(), CourierError> {
        let channel = self
            .channel_for(incoming)
            .ok_or_else(|| CourierError::Channel(format!("unknown channel {}", incoming.channel)))?;
        channel
            .send_media(Self::target_of(incoming), path, caption)
            .await
    }

    /// Reply with an error and publish it.
    pub(super) async fn report_error(&self, incoming: &IncomingMessage, message: &str) {
        self.send_text(incoming, message).await;
        self.notifier.emit(Notification::Error {
            message: message.to_string(),
        });
    }
}
