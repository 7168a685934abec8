//! Tests for the streaming CLI backend.

use super::pump::take_complete_utf8;
use super::*;
use courier_core::{message::ReplyOutcome, traits::Backend};

fn cli(command: &str, args: Vec<String>, timeout_secs: u64, cap: usize) -> CliConfig {
    CliConfig {
        command: command.into(),
        args,
        timeout_secs,
        max_output_bytes: cap,
        working_dir: None,
    }
}

#[cfg(unix)]
fn sh_backend(script: &str, timeout_secs: u64, cap: usize) -> StreamingBackend {
    StreamingBackend::from_config(
        "qwen",
        cli(
            "sh",
            vec!["-c".into(), script.into(), "sh".into()],
            timeout_secs,
            cap,
        ),
    )
}

async fn drain(handle: &mut StreamHandle) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(ev) = handle.events.recv().await {
        events.push(ev);
    }
    events
}

fn joined(events: &[StreamEvent], want: StreamSource) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk { source, text } if *source == want => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_utf8_carry_holds_split_character() {
    // "é" is 0xC3 0xA9.
    let mut pending = vec![b'a', 0xC3];
    assert_eq!(take_complete_utf8(&mut pending), "a");
    assert_eq!(pending, vec![0xC3]);
    pending.push(0xA9);
    assert_eq!(take_complete_utf8(&mut pending), "é");
    assert!(pending.is_empty());
}

#[test]
fn test_utf8_carry_replaces_invalid_bytes() {
    let mut pending = vec![b'x', 0xFF, b'y'];
    assert_eq!(take_complete_utf8(&mut pending), "x\u{FFFD}y");
    assert!(pending.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_chunks_in_order_then_done() {
    let backend = sh_backend("printf one; sleep 0.1; printf two; sleep 0.1; printf three", 10, 1024);
    let mut handle = backend.stream("x");
    let events = drain(&mut handle).await;

    assert_eq!(events.last(), Some(&StreamEvent::Done));
    assert_eq!(
        events.iter().filter(|e| **e == StreamEvent::Done).count(),
        1
    );
    assert_eq!(joined(&events, StreamSource::Stdout), "onetwothree");
    let exit = handle.status.await.unwrap().unwrap();
    assert!(exit.success);
    assert_eq!(exit.code, Some(0));
}

#[cfg(unix)]
#[tokio::test]
async fn test_stderr_chunks_are_tagged() {
    let backend = sh_backend("echo warn >&2; exit 4", 10, 1024);
    let mut handle = backend.stream("x");
    let events = drain(&mut handle).await;

    assert_eq!(joined(&events, StreamSource::Stderr).trim(), "warn");
    assert_eq!(joined(&events, StreamSource::Stdout), "");
    let exit = handle.status.await.unwrap().unwrap();
    assert!(!exit.success);
    assert_eq!(exit.code, Some(4));
}

#[tokio::test]
async fn test_spawn_error_goes_to_status_without_done() {
    let backend = StreamingBackend::from_config(
        "qwen",
        cli("/nonexistent/__courier_ghost_stream__", vec![], 1, 1024),
    );
    let mut handle = backend.stream("x");
    let events = drain(&mut handle).await;

    assert!(events.is_empty());
    let err = handle.status.await.unwrap().unwrap_err();
    assert!(matches!(err, CourierError::Spawn { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_reported_on_status() {
    let backend = sh_backend("printf early; sleep 30", 1, 1024);
    let mut handle = backend.stream("x");
    let events = drain(&mut handle).await;

    assert!(!events.contains(&StreamEvent::Done));
    let err = handle.status.await.unwrap().unwrap_err();
    assert!(matches!(err, CourierError::Timeout { secs: 1, .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_output_cap_reported_on_status() {
    let backend = sh_backend("head -c 10000 /dev/zero", 10, 100);
    let mut handle = backend.stream("x");
    let events = drain(&mut handle).await;

    assert!(!events.contains(&StreamEvent::Done));
    let err = handle.status.await.unwrap().unwrap_err();
    assert!(matches!(err, CourierError::OutputLimit { limit: 100, .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_invoke_collects_stdout() {
    let backend = sh_backend(r#"printf 'hello '; printf '%s' "$1""#, 10, 1024);
    let reply = backend.invoke("world").await.unwrap();
    assert_eq!(reply.text, "hello world");
    assert_eq!(reply.outcome, ReplyOutcome::Success);
    assert_eq!(reply.backend, "qwen");
}

#[cfg(unix)]
#[tokio::test]
async fn test_invoke_stderr_only_is_diagnostic() {
    let backend = sh_backend("echo 'quota exceeded' >&2; exit 1", 10, 1024);
    let reply = backend.invoke("x").await.unwrap();
    assert_eq!(reply.outcome, ReplyOutcome::Diagnostic);
    assert_eq!(reply.text, "[qwen] quota exceeded");
}

#[tokio::test]
async fn test_invoke_spawn_error_propagates() {
    let backend = StreamingBackend::from_config(
        "qwen",
        cli("/nonexistent/__courier_ghost_stream__", vec![], 1, 1024),
    );
    let err = backend.invoke("x").await.unwrap_err();
    assert!(err.is_pre_turn());
}
