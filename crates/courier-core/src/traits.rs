use crate::{
    error::CourierError,
    message::{BackendReply, IncomingMessage, Presence},
};
use async_trait::async_trait;
use std::path::Path;

/// AI backend trait: one prompt in, one terminal reply out.
///
/// Both the batch CLI (runs to completion) and the streaming CLI (stays
/// resident and emits chunks) implement this so the gateway can treat them
/// interchangeably.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name (`claude`, `qwen`).
    fn name(&self) -> &str;

    /// Run one prompt. `Err` means the backend never produced a turn
    /// (spawn failure, timeout, output cap); every other outcome is `Ok`.
    async fn invoke(&self, prompt: &str) -> Result<BackendReply, CourierError>;

    /// Check if the backend binary is installed and runnable.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait. The transport boundary.
///
/// The gateway only ever talks to the self-channel through this trait:
/// text replies, media delivery, and the "composing" presence indicator.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, CourierError>;

    /// Send a text message to a target.
    async fn send_text(&self, target: &str, text: &str) -> Result<(), CourierError>;

    /// Send a file from disk with a caption.
    async fn send_media(&self, target: &str, path: &Path, caption: &str)
        -> Result<(), CourierError>;

    /// Update the presence indicator. Transports without one ignore it.
    async fn send_presence(&self, _target: &str, _presence: Presence) -> Result<(), CourierError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), CourierError>;
}
