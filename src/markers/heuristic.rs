//! Fallback: spot an absolute file path in free text.

use regex::Regex;
use std::sync::LazyLock;

/// An absolute path ending in an image or document extension, starting at a
/// word boundary so URLs are not matched. Folder names carry no whitespace;
/// the file name may contain inner spaces (`Screenshot ... at 10.00.00 AM.png`)
/// and matches as short as possible.
static FILE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:^|[\s(\["'`])(/(?:[^\s/'"`<>|()\[\]]+/)*[^\s/'"`<>|()\[\]][^/\n\r\t'"`<>|()\[\]]*?\.(?:png|jpe?g|gif|webp|heic|bmp|svg|pdf|docx?|xlsx?|pptx?|csv|txt|md|zip|mp4|mov))\b"#,
    )
    .expect("hardcoded regex")
});

/// First absolute file path mentioned in `text`.
pub fn find_file_path(text: &str) -> Option<String> {
    FILE_PATH_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
