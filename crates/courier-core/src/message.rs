use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "console").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Message text content (caption for media messages).
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// Platform-specific target for routing the response.
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Whether the message was written in the self-channel.
    #[serde(default)]
    pub from_self: bool,
}

impl IncomingMessage {
    /// Build a self-channel text message.
    pub fn from_self(channel: &str, target: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: target.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            reply_target: Some(target.to_string()),
            from_self: true,
        }
    }

    /// Session key: one logical conversation per channel and target.
    pub fn session_key(&self) -> String {
        format!(
            "{}:{}",
            self.channel,
            self.reply_target.as_deref().unwrap_or(&self.sender_id)
        )
    }

    pub fn has_media(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// A file attachment on a message, already decoded by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub filename: Option<String>,
    pub data: Option<Vec<u8>>,
}

/// Supported attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Audio,
    Video,
    Other,
}

impl AttachmentKind {
    /// Fallback file extension when the transport supplies no filename.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Document => "bin",
            Self::Audio => "ogg",
            Self::Video => "mp4",
            Self::Other => "bin",
        }
    }
}

/// Transport-level presence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// "typing..." indicator.
    Composing,
    /// Clears the indicator.
    Paused,
}

/// Fire-and-forget status events published by the gateway.
///
/// Serialized with an `event` tag so a dashboard can consume them as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Notification {
    AiProcessingStarted {
        prompt: String,
        backend: String,
    },
    AiResponseReady {
        text: String,
        backend: String,
    },
    ProviderSwitched {
        backend: String,
    },
    #[serde(rename_all = "camelCase")]
    QueueProgress {
        sent_files: usize,
        total_files: usize,
        last_file: String,
    },
    #[serde(rename_all = "camelCase")]
    QueueComplete {
        total_files: usize,
    },
    Error {
        message: String,
    },
}

/// How a backend round ended. Every variant is a terminal turn that the
/// gateway records in history and relays to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Non-empty standard output.
    Success,
    /// The backend asked for a login; `url` is the first link it printed.
    AuthRequired { url: Option<String> },
    /// Standard error only, relayed verbatim with the backend name prefixed.
    Diagnostic,
    /// The process failed without printing anything.
    ProcessError,
    /// The process exited cleanly but said nothing.
    NoResponse,
}

/// Result of one backend invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendReply {
    /// Text to record and relay.
    pub text: String,
    pub outcome: ReplyOutcome,
    /// Which backend produced this reply.
    pub backend: String,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl BackendReply {
    pub fn is_success(&self) -> bool {
        self.outcome == ReplyOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_uses_reply_target() {
        let msg = IncomingMessage::from_self("console", "self", "hi");
        assert_eq!(msg.session_key(), "console:self");
    }

    #[test]
    fn test_session_key_falls_back_to_sender() {
        let mut msg = IncomingMessage::from_self("console", "self", "hi");
        msg.reply_target = None;
        msg.sender_id = "me".into();
        assert_eq!(msg.session_key(), "console:me");
    }

    #[test]
    fn test_notification_json_shape() {
        let n = Notification::QueueProgress {
            sent_files: 2,
            total_files: 3,
            last_file: "b.txt".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&n).unwrap();
        assert_eq!(json["event"], "queue-progress");
        assert_eq!(json["sentFiles"], 2);
        assert_eq!(json["totalFiles"], 3);
        assert_eq!(json["lastFile"], "b.txt");

        let n = Notification::ProviderSwitched {
            backend: "qwen".into(),
        };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"event":"provider-switched","backend":"qwen"}"#);
    }

    #[test]
    fn test_media_flag() {
        let mut msg = IncomingMessage::from_self("console", "self", "");
        assert!(!msg.has_media());
        msg.attachments.push(Attachment {
            kind: AttachmentKind::Image,
            filename: None,
            data: Some(vec![1, 2, 3]),
        });
        assert!(msg.has_media());
    }
}
