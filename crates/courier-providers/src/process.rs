//! Bounded subprocess execution shared by every backend and the screenshot tool.
//!
//! Commands are always built from structured argument lists; nothing is ever
//! passed through a shell.

use courier_core::{config::shellexpand, config::CliConfig, error::CourierError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

/// Build the base `Command` for a CLI backend with the prompt as the final argument.
pub fn cli_command(cli: &CliConfig, prompt: &str) -> Command {
    let mut cmd = Command::new(&cli.command);
    cmd.args(&cli.args)
        .arg(prompt)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(ref dir) = cli.working_dir {
        cmd.current_dir(shellexpand(dir));
    }
    // Remove CLAUDECODE env var so the CLI doesn't think it's nested.
    cmd.env_remove("CLAUDECODE");
    cmd
}

/// Spawn a command, mapping failure to `CourierError::Spawn`.
pub fn spawn(cmd: &mut Command, label: &str) -> Result<Child, CourierError> {
    cmd.spawn().map_err(|e| CourierError::Spawn {
        backend: label.to_string(),
        reason: e.to_string(),
    })
}

/// Run a command to completion with a wall-clock timeout and a per-stream
/// output cap.
///
/// Exceeding the cap is reported as `OutputLimit`, never as a truncated
/// success. On timeout or overflow the child is killed.
pub async fn run_bounded(
    mut cmd: Command,
    label: &str,
    timeout: Duration,
    max_output: usize,
) -> Result<CapturedOutput, CourierError> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = spawn(&mut cmd, label)?;
    debug!("[{label}] spawned pid {:?}", child.id());

    let result = tokio::time::timeout(timeout, capture(&mut child, label, max_output)).await;
    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            warn!("[{label}] {e}; killing process");
            let _ = child.start_kill();
            Err(e)
        }
        Err(_) => {
            warn!("[{label}] timed out after {}s; killing process", timeout.as_secs());
            let _ = child.start_kill();
            Err(CourierError::Timeout {
                backend: label.to_string(),
                secs: timeout.as_secs(),
            })
        }
    }
}

async fn capture(
    child: &mut Child,
    label: &str,
    max_output: usize,
) -> Result<CapturedOutput, CourierError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CourierError::Backend(format!("{label}: stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CourierError::Backend(format!("{label}: stderr not captured")))?;

    let (out, err) = tokio::try_join!(
        read_capped(stdout, label, max_output),
        read_capped(stderr, label, max_output)
    )?;

    let status = child
        .wait()
        .await
        .map_err(|e| CourierError::Backend(format!("{label}: wait failed: {e}")))?;

    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&out).into_owned(),
        stderr: String::from_utf8_lossy(&err).into_owned(),
        success: status.success(),
        code: status.code(),
    })
}

async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    label: &str,
    max_output: usize,
) -> Result<Vec<u8>, CourierError> {
    let mut buf = Vec::new();
    reader
        .take(max_output as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| CourierError::Backend(format!("{label}: read failed: {e}")))?;
    if buf.len() > max_output {
        return Err(CourierError::OutputLimit {
            backend: label.to_string(),
            limit: max_output,
        });
    }
    Ok(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_captures_both_streams() {
        let out = run_bounded(
            sh("echo out; echo err >&2; exit 3"),
            "sh",
            Duration::from_secs(10),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
    }

    #[tokio::test]
    async fn test_output_cap_is_a_failure() {
        let err = run_bounded(
            sh("head -c 5000 /dev/zero"),
            "sh",
            Duration::from_secs(10),
            1000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CourierError::OutputLimit { limit: 1000, .. }));
    }

    #[tokio::test]
    async fn test_output_at_cap_is_accepted() {
        let out = run_bounded(
            sh("head -c 1000 /dev/zero"),
            "sh",
            Duration::from_secs(10),
            1000,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.len(), 1000);
    }

    #[tokio::test]
    async fn test_timeout_kills() {
        let err = run_bounded(sh("sleep 30"), "sh", Duration::from_millis(200), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cmd = Command::new("/nonexistent/__courier_no_such_binary__");
        let err = run_bounded(cmd, "ghost", Duration::from_secs(1), 1024)
            .await
            .unwrap_err();
        match err {
            CourierError::Spawn { backend, .. } => assert_eq!(backend, "ghost"),
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_command_appends_prompt_last() {
        let cli = CliConfig {
            command: "claude".into(),
            args: vec!["-p".into(), "--flag".into()],
            timeout_secs: 1,
            max_output_bytes: 1,
            working_dir: None,
        };
        let cmd = cli_command(&cli, "it's \"quoted\" $HOME");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, vec!["-p", "--flag", "it's \"quoted\" $HOME"]);
        assert_eq!(cmd.as_std().get_program(), "claude");
    }
}
