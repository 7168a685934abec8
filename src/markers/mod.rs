//! Response directive extraction.
//!
//! Two stages, never blended:
//! - `directive`: the strict `[SEND_FILE:<path>]` tag the system contract asks for
//! - `heuristic`: an absolute file path mentioned in plain text, used only
//!   when no directive is present

mod directive;
mod heuristic;


pub use directive::{extract_send_file, repair_meridiem_space, strip_send_file};
pub use heuristic::find_file_path;

use std::path::{Path, PathBuf};

/// How a file reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Directive,
    Heuristic,
}

/// A file the reply asks to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub via: FileSource,
}

/// Post-processed AI reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub raw_text: String,
    /// Reply text with directives removed; used as the message or caption.
    pub cleaned_text: String,
    pub file: Option<FileRef>,
}

impl Extracted {
    pub fn via_heuristic(&self) -> bool {
        matches!(
            self.file,
            Some(FileRef {
                via: FileSource::Heuristic,
                ..
            })
        )
    }
}

/// Extract a file reference from a reply, checking directive paths on disk.
pub fn extract(raw: &str) -> Extracted {
    extract_with(raw, |p| p.exists())
}

/// Like [`extract`] with an injectable existence check.
///
/// A directive path that does not exist gets exactly one repair attempt
/// (AM/PM spacing); if that fails too, a "file not found" notice is
/// prepended and no file is reported. Heuristic paths are not checked here.
pub fn extract_with(raw: &str, exists: impl Fn(&Path) -> bool) -> Extracted {
    if let Some(path) = extract_send_file(raw) {
        let cleaned = strip_send_file(raw);

        let resolved = if exists(Path::new(&path)) {
            Some(PathBuf::from(&path))
        } else {
            repair_meridiem_space(&path)
                .map(PathBuf::from)
                .filter(|p| exists(p))
        };

        return match resolved {
            Some(path) => Extracted {
                raw_text: raw.to_string(),
                cleaned_text: cleaned,
                file: Some(FileRef {
                    path,
                    via: FileSource::Directive,
                }),
            },
            None => {
                tracing::warn!("SEND_FILE target not found: {path}");
                let notice = format!("(file not found: {path})");
                let cleaned_text = if cleaned.is_empty() {
                    notice
                } else {
                    format!("{notice}\n\n{cleaned}")
                };
                Extracted {
                    raw_text: raw.to_string(),
                    cleaned_text,
                    file: None,
                }
            }
        };
    }

    Extracted {
        raw_text: raw.to_string(),
        cleaned_text: raw.to_string(),
        file: find_file_path(raw).map(|p| FileRef {
            path: PathBuf::from(p),
            via: FileSource::Heuristic,
        }),
    }
}

/// Collapse runs of spaces/tabs within lines and runs of blank lines, then trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && out.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}
