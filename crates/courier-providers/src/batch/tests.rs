//! Tests for the batch CLI backend.

use super::response::extract_first_url;
use super::*;
use crate::process::CapturedOutput;
use courier_core::{error::CourierError, message::ReplyOutcome, traits::Backend};

fn output(stdout: &str, stderr: &str, success: bool) -> CapturedOutput {
    CapturedOutput {
        stdout: stdout.into(),
        stderr: stderr.into(),
        success,
        code: Some(if success { 0 } else { 1 }),
    }
}

#[test]
fn test_from_config() {
    let backend = BatchBackend::from_config("claude", CliConfig::claude());
    assert_eq!(backend.name, "claude");
    assert_eq!(backend.timeout, Duration::from_secs(600));
    assert_eq!(backend.cli.command, "claude");
}

#[test]
fn test_stdout_wins_over_everything() {
    let (text, outcome) = classify_output(
        "claude",
        "claude",
        &output("  hello there \n", "please login at https://x.io", false),
    );
    assert_eq!(text, "hello there");
    assert_eq!(outcome, ReplyOutcome::Success);
}

#[test]
fn test_auth_required_with_url() {
    let (text, outcome) = classify_output(
        "claude",
        "claude",
        &output(
            "",
            "Error: not logged in. Visit https://auth.example.com/device?code=AB12. then retry",
            false,
        ),
    );
    assert_eq!(
        outcome,
        ReplyOutcome::AuthRequired {
            url: Some("https://auth.example.com/device?code=AB12".into())
        }
    );
    assert!(text.contains("https://auth.example.com/device?code=AB12"));
}

#[test]
fn test_auth_required_without_url() {
    let (text, outcome) = classify_output(
        "qwen",
        "/usr/local/bin/qwen",
        &output("", "Please authenticate first", true),
    );
    assert_eq!(outcome, ReplyOutcome::AuthRequired { url: None });
    assert!(text.contains("/usr/local/bin/qwen"));
}

#[test]
fn test_stderr_diagnostic_is_prefixed() {
    let (text, outcome) = classify_output(
        "claude",
        "claude",
        &output("", "rate limit exceeded\n", false),
    );
    assert_eq!(outcome, ReplyOutcome::Diagnostic);
    assert_eq!(text, "[claude] rate limit exceeded");
}

#[test]
fn test_process_error_without_output() {
    let (text, outcome) = classify_output("claude", "claude", &output("", "", false));
    assert_eq!(outcome, ReplyOutcome::ProcessError);
    assert!(text.contains("exited with 1"));
}

#[test]
fn test_no_response() {
    let (text, outcome) = classify_output("claude", "claude", &output("  \n", "", true));
    assert_eq!(outcome, ReplyOutcome::NoResponse);
    assert!(text.contains("no response"));
}

#[test]
fn test_extract_first_url() {
    assert_eq!(
        extract_first_url("go to (https://a.b/c), or http://d.e"),
        Some("https://a.b/c".to_string())
    );
    assert_eq!(extract_first_url("no links here"), None);
}

#[cfg(unix)]
fn sh_backend(script: &str, max_output_bytes: usize) -> BatchBackend {
    BatchBackend::from_config(
        "test",
        CliConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into(), "sh".into()],
            timeout_secs: 10,
            max_output_bytes,
            working_dir: None,
        },
    )
}

#[cfg(unix)]
#[tokio::test]
async fn test_invoke_passes_prompt_as_single_argument() {
    // $1 is the prompt appended after the script's $0.
    let backend = sh_backend(r#"printf '%s' "$1""#, 1024);
    let reply = backend.invoke("it's a \"prompt\"; rm -rf /").await.unwrap();
    assert_eq!(reply.text, "it's a \"prompt\"; rm -rf /");
    assert_eq!(reply.outcome, ReplyOutcome::Success);
    assert_eq!(reply.backend, "test");
}

#[cfg(unix)]
#[tokio::test]
async fn test_invoke_diagnostic_from_real_process() {
    let backend = sh_backend("echo boom >&2; exit 2", 1024);
    let reply = backend.invoke("x").await.unwrap();
    assert_eq!(reply.outcome, ReplyOutcome::Diagnostic);
    assert_eq!(reply.text, "[test] boom");
}

#[cfg(unix)]
#[tokio::test]
async fn test_invoke_output_cap() {
    let backend = sh_backend("head -c 4096 /dev/zero", 100);
    let err = backend.invoke("x").await.unwrap_err();
    assert!(matches!(err, CourierError::OutputLimit { limit: 100, .. }));
}

#[tokio::test]
async fn test_invoke_spawn_error() {
    let backend = BatchBackend::from_config(
        "ghost",
        CliConfig {
            command: "/nonexistent/__courier_ghost_cli__".into(),
            args: vec![],
            timeout_secs: 1,
            max_output_bytes: 1024,
            working_dir: None,
        },
    );
    let err = backend.invoke("x").await.unwrap_err();
    assert!(matches!(err, CourierError::Spawn { .. }));
    assert!(!backend.is_available().await);
}
