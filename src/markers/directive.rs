//! `[SEND_FILE:<absolute-path>]` directive parsing.

use regex::Regex;
use std::sync::LazyLock;

static SEND_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[SEND_FILE:\s*([^\]\n]+?)\s*\]").expect("hardcoded regex")
});

static SPACE_BEFORE_MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" (AM|PM)\b").expect("hardcoded regex"));

/// Path of the first `SEND_FILE` directive, if any.
pub fn extract_send_file(text: &str) -> Option<String> {
    SEND_FILE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|p| !p.is_empty())
}

/// Remove every `SEND_FILE` directive, collapsing the whitespace around it.
pub fn strip_send_file(text: &str) -> String {
    super::collapse_whitespace(&SEND_FILE_RE.replace_all(text, " "))
}

/// macOS screenshot names put U+202F (narrow no-break space) before AM/PM,
/// which AI backends tend to retype as a plain space.
///
/// Returns `None` when the path has nothing to repair.
pub fn repair_meridiem_space(path: &str) -> Option<String> {
    if !SPACE_BEFORE_MERIDIEM_RE.is_match(path) {
        return None;
    }
    Some(
        SPACE_BEFORE_MERIDIEM_RE
            .replace_all(path, "\u{202F}$1")
            .into_owned(),
    )
}
