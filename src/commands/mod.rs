//! Built-in commands: classification of inbound self-channel text.
//!
//! Precedence, case-insensitive on the command word: exact commands, then
//! prefix commands that need a payload, then a free-form prompt. Text that
//! matches nothing and carries media goes to the media pipeline instead.

mod status;


pub use status::{format_status, StatusSnapshot};

use courier_core::{config::BackendKind, error::CourierError};

pub const USAGE_SEND: &str = "/send <path>";
pub const USAGE_SCREENSHOT: &str = "/screenshot <http(s)://url>";
pub const USAGE_QUEUE: &str = "/queue <folder> [interval_seconds]";

/// Known commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SwitchProvider(BackendKind),
    Status,
    Clear,
    SendFile(String),
    Screenshot(String),
    QueueStart { folder: String, interval_secs: u64 },
    QueueStatus,
    QueueStop,
    FreeformPrompt(String),
}

impl Command {
    /// Classify one inbound message.
    ///
    /// Returns `Ok(None)` when there is nothing to forward as a prompt: an
    /// empty message, or a media message without a command. A prefix command
    /// with a malformed payload is a `Usage` error.
    pub fn parse(
        text: &str,
        has_media: bool,
        default_interval_secs: u64,
    ) -> Result<Option<Self>, CourierError> {
        let text = text.trim();
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "/claude" => return Ok(Some(Self::SwitchProvider(BackendKind::Claude))),
            "/qwen" => return Ok(Some(Self::SwitchProvider(BackendKind::Qwen))),
            "/status" => return Ok(Some(Self::Status)),
            "/clear" => return Ok(Some(Self::Clear)),
            _ => {}
        }

        let (word, payload) = match text.split_once(char::is_whitespace) {
            Some((w, rest)) => (w.to_lowercase(), rest.trim()),
            None => (text.to_lowercase(), ""),
        };

        match word.as_str() {
            "/queue-status" => return Ok(Some(Self::QueueStatus)),
            "/queue-stop" => return Ok(Some(Self::QueueStop)),
            "/queue" => return parse_queue(payload, default_interval_secs).map(Some),
            "/send" => {
                if payload.is_empty() {
                    return Err(CourierError::Usage(USAGE_SEND.into()));
                }
                return Ok(Some(Self::SendFile(payload.to_string())));
            }
            "/screenshot" => return parse_screenshot(payload).map(Some),
            _ => {}
        }

        if has_media || text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::FreeformPrompt(text.to_string())))
    }

    /// Commands answered without an AI round.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::FreeformPrompt(_))
    }
}

/// `/queue <folder> [seconds]`. A trailing integer is the interval; the rest
/// (which may contain spaces) is the folder.
fn parse_queue(payload: &str, default_interval_secs: u64) -> Result<Command, CourierError> {
    if payload.is_empty() {
        return Err(CourierError::Usage(USAGE_QUEUE.into()));
    }

    let (folder, interval_secs) = match payload.rsplit_once(char::is_whitespace) {
        Some((head, last)) if last.chars().all(|c| c.is_ascii_digit()) => {
            let secs = last
                .parse::<u64>()
                .map_err(|_| CourierError::Usage(USAGE_QUEUE.into()))?;
            (head.trim(), secs)
        }
        _ => (payload, default_interval_secs),
    };

    if folder.is_empty() || interval_secs == 0 {
        return Err(CourierError::Usage(USAGE_QUEUE.into()));
    }
    Ok(Command::QueueStart {
        folder: folder.to_string(),
        interval_secs,
    })
}

fn parse_screenshot(payload: &str) -> Result<Command, CourierError> {
    let mut parts = payload.split_whitespace();
    let url = parts.next().unwrap_or("");
    let lower = url.to_lowercase();
    let host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match host {
        Some(h) if !h.is_empty() && parts.next().is_none() => {
            Ok(Command::Screenshot(url.to_string()))
        }
        _ => Err(CourierError::Usage(USAGE_SCREENSHOT.into())),
    }
}
