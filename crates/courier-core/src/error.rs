use thiserror::Error;

/// Top-level error type for Courier.
///
/// Variants mirror the failure classes the gateway reports to the user:
/// each one ends in either a reply on the self-channel or an `error`
/// notification, never in silence.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Malformed command payload. Carries the usage string shown to the user.
    #[error("usage: {0}")]
    Usage(String),

    /// A file or folder the user referenced does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A round is already open for this session.
    #[error("a round is already in flight for {0}")]
    Busy(String),

    /// The backend process misbehaved after it started (lost pipes, wait failure).
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend process could not be started at all.
    #[error("failed to start {backend}: {reason}")]
    Spawn { backend: String, reason: String },

    /// Captured output exceeded the configured cap.
    #[error("{backend} output exceeded {limit} bytes")]
    OutputLimit { backend: String, limit: usize },

    /// The backend did not finish within its wall-clock budget.
    #[error("{backend} timed out after {secs}s")]
    Timeout { backend: String, secs: u64 },

    /// Media delivery through the channel failed.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CourierError {
    /// Whether the failure happened before the backend produced a turn.
    ///
    /// Such failures are reported to the user but never written to the
    /// conversation history.
    pub fn is_pre_turn(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::OutputLimit { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_turn_classes() {
        let spawn = CourierError::Spawn {
            backend: "claude".into(),
            reason: "not found".into(),
        };
        let timeout = CourierError::Timeout {
            backend: "qwen".into(),
            secs: 600,
        };
        assert!(spawn.is_pre_turn());
        assert!(timeout.is_pre_turn());
        assert!(!CourierError::Backend("wait failed".into()).is_pre_turn());
        assert!(!CourierError::Delivery("offline".into()).is_pre_turn());
    }
}
