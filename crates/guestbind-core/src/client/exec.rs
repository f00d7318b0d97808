//! One-shot guest process execution.
//!
//! Spawns the guest, writes the request, drains stdout and stderr while the
//! process runs, and races all of that against cancellation and the optional
//! per-call timeout. The child is killed and reaped on every early exit.

use std::future::pending;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::GuestClient;
use crate::cancel::CancellationToken;
use crate::error::{GuestbindError, Result};

/// Everything captured from a finished guest process.
#[derive(Debug)]
pub(crate) struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Signal number, on Unix, when the process did not exit normally.
    pub signal: Option<i32>,
}

type Drained = (
    std::io::Result<()>,
    std::io::Result<Vec<u8>>,
    std::io::Result<Vec<u8>>,
    std::io::Result<std::process::ExitStatus>,
);

enum Completion {
    Finished(Drained),
    Cancelled,
    TimedOut,
}

impl GuestClient {
    pub(crate) async fn execute(
        &self,
        function: &str,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<RawOutput> {
        let mut command = Command::new(&self.binary_path);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.envs(self.env.iter().map(|(k, v)| (k, v)));

        let mut child = command.spawn().map_err(|e| GuestbindError::ProcessFailure {
            message: format!("failed to start {}: {}", self.binary_path.display(), e),
            exit_code: None,
            stderr: String::new(),
            source: Some(e),
        })?;
        debug!(
            "Spawned guest {} (pid {:?}) for {} with {} byte request",
            self.binary_path.display(),
            child.id(),
            function,
            payload.len()
        );

        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            terminate(&mut child, function).await;
            return Err(GuestbindError::process(
                "guest stdio was not captured",
                None,
                b"",
            ));
        };

        let timeout = self.timeout;
        let completion = {
            let write = async move {
                let written = stdin.write_all(payload).await;
                // Dropping stdin closes the pipe; the guest reads to EOF.
                drop(stdin);
                written
            };
            let read_stdout = async move {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).await.map(|_| buf)
            };
            let read_stderr = async move {
                let mut buf = Vec::new();
                stderr.read_to_end(&mut buf).await.map(|_| buf)
            };
            let run = async {
                let (written, out, err) = tokio::join!(write, read_stdout, read_stderr);
                let status = child.wait().await;
                (written, out, err, status)
            };
            let deadline = async {
                match timeout {
                    Some(duration) => tokio::time::sleep(duration).await,
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Completion::Cancelled,
                _ = deadline => Completion::TimedOut,
                drained = run => Completion::Finished(drained),
            }
        };

        match settle(completion, cancel.is_cancelled()) {
            Completion::Finished(drained) => collect(function, drained),
            Completion::Cancelled => {
                debug!("Guest call {} cancelled", function);
                terminate(&mut child, function).await;
                Err(GuestbindError::Cancelled {
                    function: function.to_string(),
                })
            }
            Completion::TimedOut => {
                let timeout = timeout.unwrap_or_default();
                warn!("Guest call {} timed out after {:?}", function, timeout);
                terminate(&mut child, function).await;
                Err(GuestbindError::Timeout {
                    function: function.to_string(),
                    timeout,
                })
            }
        }
    }
}

/// A result that raced a cancellation is discarded.
fn settle(completion: Completion, cancelled: bool) -> Completion {
    match completion {
        Completion::Finished(_) if cancelled => Completion::Cancelled,
        other => other,
    }
}

fn collect(function: &str, drained: Drained) -> Result<RawOutput> {
    let (written, stdout, stderr, status) = drained;

    let stderr = stderr.map_err(|e| GuestbindError::ProcessFailure {
        message: format!("failed to read guest stderr: {}", e),
        exit_code: None,
        stderr: String::new(),
        source: Some(e),
    })?;
    let stdout = stdout.map_err(|e| GuestbindError::ProcessFailure {
        message: format!("failed to read guest stdout: {}", e),
        exit_code: None,
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        source: Some(e),
    })?;
    let status = status.map_err(|e| GuestbindError::ProcessFailure {
        message: format!("failed to wait for guest: {}", e),
        exit_code: None,
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        source: Some(e),
    })?;

    if let Err(e) = written {
        // A guest may exit without reading its input; its exit status still decides.
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            debug!("Guest {} closed stdin before reading the request", function);
        } else {
            return Err(GuestbindError::ProcessFailure {
                message: format!("failed to write request to guest: {}", e),
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                source: Some(e),
            });
        }
    }

    debug!(
        "Guest call {} exited with {:?} ({} bytes stdout, {} bytes stderr)",
        function,
        status.code(),
        stdout.len(),
        stderr.len()
    );

    Ok(RawOutput {
        stdout,
        stderr,
        exit_code: status.code(),
        signal: exit_signal(&status),
    })
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Kill the child and reap it so no process outlives the call.
async fn terminate(child: &mut Child, function: &str) {
    if let Err(e) = child.kill().await {
        debug!("Killing guest for {} failed (likely already exited): {}", function, e);
    }
}
