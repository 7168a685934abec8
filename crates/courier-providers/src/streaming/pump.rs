//! Pipe pumping for the streaming backend.

use super::{ProcessExit, StreamEvent, StreamSource};
use crate::process::spawn;
use courier_core::error::CourierError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const READ_BUF: usize = 4096;

/// Spawn, forward output until exit, and report how the process ended.
pub(super) async fn run(
    mut cmd: Command,
    name: &str,
    timeout: Duration,
    cap: usize,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<ProcessExit, CourierError> {
    let mut child = spawn(&mut cmd, name)?;
    debug!("[{name}] streaming pid {:?}", child.id());

    match tokio::time::timeout(timeout, forward(&mut child, name, cap, tx)).await {
        Ok(Ok(exit)) => Ok(exit),
        Ok(Err(e)) => {
            warn!("[{name}] {e}; killing process");
            let _ = child.start_kill();
            Err(e)
        }
        Err(_) => {
            warn!("[{name}] timed out after {}s; killing process", timeout.as_secs());
            let _ = child.start_kill();
            Err(CourierError::Timeout {
                backend: name.to_string(),
                secs: timeout.as_secs(),
            })
        }
    }
}

async fn forward(
    child: &mut Child,
    name: &str,
    cap: usize,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<ProcessExit, CourierError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CourierError::Backend(format!("{name}: stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CourierError::Backend(format!("{name}: stderr not captured")))?;

    tokio::try_join!(
        pump(stdout, StreamSource::Stdout, name, cap, tx.clone()),
        pump(stderr, StreamSource::Stderr, name, cap, tx)
    )?;

    let status = child
        .wait()
        .await
        .map_err(|e| CourierError::Backend(format!("{name}: wait failed: {e}")))?;
    Ok(ProcessExit {
        success: status.success(),
        code: status.code(),
    })
}

/// Read one pipe to EOF, emitting UTF-8 chunks.
///
/// A multi-byte character split across reads is held back until complete.
async fn pump<R: AsyncRead + Unpin>(
    mut reader: R,
    source: StreamSource,
    name: &str,
    cap: usize,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<(), CourierError> {
    let mut buf = [0u8; READ_BUF];
    let mut pending: Vec<u8> = Vec::new();
    let mut total = 0usize;

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| CourierError::Backend(format!("{name}: read failed: {e}")))?;
        if n == 0 {
            break;
        }
        total += n;
        if total > cap {
            return Err(CourierError::OutputLimit {
                backend: name.to_string(),
                limit: cap,
            });
        }
        pending.extend_from_slice(&buf[..n]);
        let text = take_complete_utf8(&mut pending);
        if !text.is_empty() && tx.send(StreamEvent::Chunk { source, text }).await.is_err() {
            debug!("[{name}] stream receiver dropped");
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        let _ = tx.send(StreamEvent::Chunk { source, text }).await;
    }
    Ok(())
}

/// Drain the longest valid UTF-8 prefix of `pending`, leaving an incomplete
/// trailing sequence in place. Invalid bytes are replaced.
pub(super) fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(s) => {
            let text = s.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
