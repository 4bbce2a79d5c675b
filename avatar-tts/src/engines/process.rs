//! Subprocess execution for command-line engines

use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

use crate::error::{Result, TtsError};

/// Ceiling for a single local synthesis
pub(crate) const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `command` to completion, feeding `input` on stdin.
///
/// The child is killed if the timeout elapses or the future is dropped.
pub(crate) async fn run(
    mut command: Command,
    input: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| TtsError::CommandFailed(format!("Failed to execute: {}", e)))?;

    // Feeding stdin counts against the timeout
    let stdin = child.stdin.take();
    let exchange = async move {
        if let (Some(input), Some(mut stdin)) = (input, stdin) {
            feed(&mut stdin, input).await?;
            // stdin is dropped here, closing the pipe
        }
        child.wait_with_output().await
    };

    let output = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| TtsError::Timeout {
            secs: timeout.as_secs(),
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TtsError::CommandFailed(format!(
            "exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}

/// Write `input` and a trailing newline.
///
/// A child that exits without reading is reported through its exit status,
/// so a broken pipe is not an error here.
async fn feed(stdin: &mut ChildStdin, input: &[u8]) -> std::io::Result<()> {
    let written = match stdin.write_all(input).await {
        Ok(()) => stdin.write_all(b"\n").await,
        Err(e) => Err(e),
    };
    match written {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Quote `value` as a single POSIX shell word
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
