//! AI round pipeline: prompt, backend call, directive extraction, reply.

use super::inbox::{ensure_inbox_dir, save_attachments_to_inbox, InboxGuard};
use super::presence::Heartbeat;
use super::Gateway;
use crate::markers::{self, Extracted};
use courier_core::message::{IncomingMessage, Notification};
use tracing::{error, info, warn};

impl Gateway {
    /// Process one prompt (text or media) through a full AI round.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        info!("[{}] prompt: {}", incoming.channel, preview);

        let mut prompt = incoming.text.trim().to_string();
        let _inbox_guard = if incoming.has_media() {
            let inbox = ensure_inbox_dir(&self.data_dir);
            let paths = save_attachments_to_inbox(&inbox, &incoming.attachments);
            if paths.is_empty() {
                self.report_error(&incoming, "Could not read the attached file.")
                    .await;
                return;
            }
            for path in paths.iter().rev() {
                prompt = format!("[Attached file: {}]\n{prompt}", path.display());
            }
            InboxGuard::new(paths)
        } else {
            InboxGuard::new(Vec::new())
        };

        self.run_round(&incoming, prompt.trim_end()).await;
    }

    async fn run_round(&self, incoming: &IncomingMessage, prompt: &str) {
        let kind = *self.current.lock().await;
        let Some(backend) = self.backends.get(&kind).cloned() else {
            self.report_error(incoming, &format!("{} is not configured.", kind.display_name()))
                .await;
            return;
        };

        let session = incoming.session_key();
        let begun = self
            .conversations
            .lock()
            .await
            .begin_round(&session, kind.name(), prompt);
        let round = match begun {
            Ok(round) => round,
            Err(e) => {
                warn!("[{session}] {e}");
                self.send_text(incoming, "Still working on the previous message.")
                    .await;
                return;
            }
        };

        self.notifier.emit(Notification::AiProcessingStarted {
            prompt: prompt.to_string(),
            backend: kind.name().to_string(),
        });

        let heartbeat = self
            .channel_for(incoming)
            .map(|ch| Heartbeat::new(ch, Self::target_of(incoming), self.presence_interval));
        if let Some(ref hb) = heartbeat {
            hb.start().await;
        }

        let result = backend.invoke(&round.prompt).await;

        if let Some(ref hb) = heartbeat {
            hb.stop().await;
        }

        match result {
            Ok(reply) => {
                self.conversations
                    .lock()
                    .await
                    .complete_round(round, &reply.text);
                info!(
                    "[{}] reply | outcome: {:?} | {}ms",
                    reply.backend, reply.outcome, reply.processing_time_ms
                );

                let extracted = markers::extract(&reply.text);
                self.deliver_reply(incoming, &extracted).await;

                if reply.is_success() {
                    self.notifier.emit(Notification::AiResponseReady {
                        text: extracted.cleaned_text,
                        backend: reply.backend,
                    });
                } else {
                    self.notifier.emit(Notification::Error {
                        message: extracted.raw_text,
                    });
                }
            }
            Err(e) => {
                error!("[{}] round failed: {e}", kind.name());
                let message = format!("{} failed: {e}", kind.display_name());
                {
                    let mut conversations = self.conversations.lock().await;
                    if e.is_pre_turn() {
                        conversations.abandon_round(round);
                    } else {
                        // The process ran and broke mid-turn: keep the failure as its reply.
                        conversations.complete_round(round, &message);
                    }
                }
                self.report_error(incoming, &message).await;
            }
        }
    }

    /// Send the cleaned reply, as a caption when a file goes with it.
    async fn deliver_reply(&self, incoming: &IncomingMessage, extracted: &Extracted) {
        let text = if extracted.cleaned_text.is_empty() && extracted.file.is_none() {
            "(empty reply)"
        } else {
            extracted.cleaned_text.as_str()
        };

        let Some(ref file) = extracted.file else {
            self.send_text(incoming, text).await;
            return;
        };

        if extracted.via_heuristic() && !file.path.is_file() {
            warn!(
                "reply mentions {} but it does not exist; sending text only",
                file.path.display()
            );
            self.send_text(incoming, text).await;
            return;
        }

        info!("sending file {} ({:?})", file.path.display(), file.via);
        if let Err(e) = self.send_media(incoming, &file.path, text).await {
            warn!("failed to send {}: {e}", file.path.display());
            let fallback = if text.is_empty() {
                format!("(could not send {}: {e})", file.path.display())
            } else {
                format!("{text}\n\n(could not send {}: {e})", file.path.display())
            };
            self.report_error(incoming, &fallback).await;
        }
    }
}
