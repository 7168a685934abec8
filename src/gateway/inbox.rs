//! Scratch storage for inbound media handed to the AI backend.

use courier_core::message::Attachment;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ensure `{data_dir}/inbox` exists and return its path.
pub fn ensure_inbox_dir(data_dir: &Path) -> PathBuf {
    let dir = data_dir.join("inbox");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Write attachments into the inbox and return their paths.
///
/// Zero-byte and data-less attachments are skipped. Each file gets a unique
/// prefix so concurrent messages never collide.
pub fn save_attachments_to_inbox(inbox: &Path, attachments: &[Attachment]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for attachment in attachments {
        let Some(ref data) = attachment.data else {
            continue;
        };
        if data.is_empty() {
            warn!("inbox: skipping zero-byte attachment");
            continue;
        }

        let name = attachment
            .filename
            .as_deref()
            .and_then(|f| Path::new(f).file_name())
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("attachment.{}", attachment.kind.default_extension()));
        let short_id = Uuid::new_v4().simple().to_string();
        let path = inbox.join(format!("{}_{name}", &short_id[..8]));

        match std::fs::File::create(&path) {
            Ok(mut file) => {
                if file.write_all(data).is_ok() && file.sync_all().is_ok() {
                    debug!("inbox: wrote {} ({} bytes)", path.display(), data.len());
                    paths.push(path);
                } else {
                    warn!("inbox: failed to write {}", path.display());
                    let _ = std::fs::remove_file(&path);
                }
            }
            Err(e) => warn!("inbox: failed to create {}: {e}", path.display()),
        }
    }
    paths
}

/// Removes scratch files (inbox media, screenshots) when dropped.
pub struct InboxGuard {
    paths: Vec<PathBuf>,
}

impl InboxGuard {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Drop for InboxGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Purge all files in the inbox directory (startup cleanup).
pub fn purge_inbox(data_dir: &Path) {
    let inbox = ensure_inbox_dir(data_dir);
    if let Ok(entries) = std::fs::read_dir(&inbox) {
        let mut count = 0u32;
        for entry in entries.flatten() {
            if entry.path().is_file() {
                let _ = std::fs::remove_file(entry.path());
                count += 1;
            }
        }
        if count > 0 {
            info!("startup: purged {count} orphaned inbox file(s)");
        }
    }
}
