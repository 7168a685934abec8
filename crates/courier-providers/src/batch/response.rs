//! Outcome classification for a finished CLI process.

use crate::process::CapturedOutput;
use courier_core::message::ReplyOutcome;
use regex::Regex;
use std::sync::LazyLock;

/// Substrings (lowercase) that mean the CLI wants an interactive login.
const AUTH_MARKERS: &[&str] = &[
    "login",
    "log in",
    "authenticat",
    "unauthorized",
    "oauth",
    "not logged in",
];

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("hardcoded regex"));

/// First well-formed URL in `text`, without trailing sentence punctuation.
pub(crate) fn extract_first_url(text: &str) -> Option<String> {
    URL_RE.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', ']', '!', '?'])
            .to_string()
    })
}

fn wants_login(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    AUTH_MARKERS.iter().any(|m| lower.contains(m))
}

/// Classify a finished process by strict precedence:
/// stdout, then login request, then other stderr, then exit failure, then silence.
pub(crate) fn classify_output(
    name: &str,
    command: &str,
    output: &CapturedOutput,
) -> (String, ReplyOutcome) {
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        return (stdout.to_string(), ReplyOutcome::Success);
    }

    let stderr = output.stderr.trim();
    if !stderr.is_empty() && wants_login(stderr) {
        let url = extract_first_url(stderr);
        let text = match url {
            Some(ref url) => format!("🔐 {name} needs you to log in. Open this link: {url}"),
            None => format!(
                "🔐 {name} needs you to log in. Run `{command}` in a terminal on this \
                 machine and complete the login, then try again."
            ),
        };
        return (text, ReplyOutcome::AuthRequired { url });
    }

    if !stderr.is_empty() {
        return (format!("[{name}] {stderr}"), ReplyOutcome::Diagnostic);
    }

    if !output.success {
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "a signal".to_string());
        return (
            format!("⚠️ {name} exited with {code} and produced no output. Please try again."),
            ReplyOutcome::ProcessError,
        );
    }

    (
        format!("{name} returned no response. Please try again."),
        ReplyOutcome::NoResponse,
    )
}
