//! Turning console lines into inbound messages.

use courier_core::{
    error::CourierError,
    message::{Attachment, AttachmentKind, IncomingMessage},
};
use std::path::Path;

const ATTACH_PREFIX: &str = "@file ";

/// Parse one input line. Blank lines yield `None`.
pub(super) async fn parse_line(
    channel: &str,
    target: &str,
    line: &str,
) -> Result<Option<IncomingMessage>, CourierError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(ATTACH_PREFIX) else {
        return Ok(Some(IncomingMessage::from_self(channel, target, line)));
    };

    let rest = rest.trim();
    let (path, caption) = match rest.split_once(char::is_whitespace) {
        Some((p, c)) => (p, c.trim()),
        None => (rest, ""),
    };
    let path = Path::new(path);
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| CourierError::NotFound(format!("{}: {e}", path.display())))?;

    let mut msg = IncomingMessage::from_self(channel, target, caption);
    msg.attachments.push(Attachment {
        kind: kind_for(path),
        filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        data: Some(data),
    });
    Ok(Some(msg))
}

/// Attachment kind from the file extension.
pub(super) fn kind_for(path: &Path) -> AttachmentKind {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "heic" => AttachmentKind::Image,
        "pdf" | "doc" | "docx" | "txt" | "md" | "csv" | "xlsx" | "pptx" | "zip" => {
            AttachmentKind::Document
        }
        "mp3" | "ogg" | "wav" | "m4a" | "opus" => AttachmentKind::Audio,
        "mp4" | "mov" | "webm" | "mkv" => AttachmentKind::Video,
        _ => AttachmentKind::Other,
    }
}
