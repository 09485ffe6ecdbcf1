//! Subprocess launch, stream capture, timeout, and kill

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use super::CancelSignal;
use crate::tools::Invocation;

/// Maximum captured output size in bytes (10MB)
pub const MAX_OUTPUT_SIZE: usize = 10_485_760;

/// How long to wait for a killed child to be reaped
const KILL_GRACE: Duration = Duration::from_secs(5);

/// How long to wait for output pipes to drain after the child is gone.
/// Grandchildren inheriting the pipe can hold it open indefinitely, so the
/// captured-so-far buffers are snapshotted when this expires.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Terminal outcome of one subprocess run. Partial output captured before a
/// timeout or cancellation is retained, not discarded.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Exited {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    TimedOut {
        stdout: String,
        stderr: String,
    },
    Cancelled {
        stdout: String,
        stderr: String,
    },
    SpawnFailed {
        error: String,
    },
}

/// Seam between the supervisor and real subprocesses. Tests inject a scripted
/// implementation so timeout and cancellation paths run without binaries.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation, cancel: CancelSignal) -> RunOutcome;
}

/// Real runner over `tokio::process`
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation, mut cancel: CancelSignal) -> RunOutcome {
        debug!("spawning {} {:?}", invocation.program, invocation.args);

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunOutcome::SpawnFailed {
                    error: format!("{}: {}", invocation.program, e),
                }
            }
        };

        if let Some(input) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(input.as_bytes()).await;
                let _ = stdin.write_all(b"\n").await;
                // dropping the handle closes the pipe
            }
        }

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let mut stdout_task = spawn_reader(child.stdout.take(), Arc::clone(&stdout_buf));
        let mut stderr_task = spawn_reader(child.stderr.take(), Arc::clone(&stderr_buf));

        enum Wait {
            Exited(i32),
            WaitError(String),
            TimedOut,
            Cancelled,
        }

        let waited = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Wait::Exited(status.code().unwrap_or(-1)),
                Err(e) => Wait::WaitError(e.to_string()),
            },
            () = tokio::time::sleep(invocation.timeout) => Wait::TimedOut,
            () = cancel.cancelled() => Wait::Cancelled,
        };

        if matches!(waited, Wait::TimedOut | Wait::Cancelled) {
            let _ = child.start_kill();
            let _ = tokio::time::timeout(KILL_GRACE, child.wait()).await;
        }

        // Wait briefly for EOF on the pipes, then take what was captured.
        // The reader tasks only ever append, so a snapshot here is safe even
        // if something downstream still holds the pipe open.
        let _ = tokio::time::timeout(DRAIN_GRACE, async {
            let _ = (&mut stdout_task).await;
            let _ = (&mut stderr_task).await;
        })
        .await;
        let stdout = snapshot(&stdout_buf);
        let stderr = snapshot(&stderr_buf);

        match waited {
            Wait::Exited(exit_code) => RunOutcome::Exited {
                stdout,
                stderr,
                exit_code,
            },
            Wait::WaitError(error) => RunOutcome::SpawnFailed { error },
            Wait::TimedOut => RunOutcome::TimedOut { stdout, stderr },
            Wait::Cancelled => RunOutcome::Cancelled { stdout, stderr },
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>, buf: Arc<Mutex<Vec<u8>>>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(pipe) = pipe else { return };
        read_capped(pipe, &buf).await;
    })
}

/// Read a stream to EOF into the shared buffer, keeping at most
/// [`MAX_OUTPUT_SIZE`] bytes. The stream is drained past the cap so a chatty
/// child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, buf: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = buf.lock() {
                    if buf.len() < MAX_OUTPUT_SIZE {
                        let take = n.min(MAX_OUTPUT_SIZE - buf.len());
                        buf.extend_from_slice(&chunk[..take]);
                    }
                }
            }
        }
    }
}

fn snapshot(buf: &Mutex<Vec<u8>>) -> String {
    buf.lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::cancellation;

    fn sh(script: &str, timeout: Duration) -> Invocation {
        Invocation {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            stdin: None,
            timeout,
        }
    }

    fn idle_cancel() -> CancelSignal {
        let (handle, signal) = cancellation();
        std::mem::forget(handle);
        signal
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let outcome = TokioProcessRunner
            .run(&sh("echo hello", Duration::from_secs(5)), idle_cancel())
            .await;

        match outcome {
            RunOutcome::Exited {
                stdout, exit_code, ..
            } => {
                assert_eq!(exit_code, 0);
                assert_eq!(stdout.trim(), "hello");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_with_stderr() {
        let outcome = TokioProcessRunner
            .run(
                &sh("echo oops >&2; exit 3", Duration::from_secs(5)),
                idle_cancel(),
            )
            .await;

        match outcome {
            RunOutcome::Exited {
                stderr, exit_code, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let outcome = TokioProcessRunner
            .run(
                &sh("echo partial; sleep 30", Duration::from_millis(300)),
                idle_cancel(),
            )
            .await;

        match outcome {
            RunOutcome::TimedOut { stdout, .. } => assert_eq!(stdout.trim(), "partial"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_kills_child() {
        let (handle, signal) = cancellation();
        let invocation = sh("sleep 30", Duration::from_secs(60));
        let run = TokioProcessRunner.run(&invocation, signal);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("should still be running"),
            () = tokio::time::sleep(Duration::from_millis(100)) => handle.cancel(),
        }

        let started = std::time::Instant::now();
        let outcome = run.await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let invocation = Invocation {
            program: "/nonexistent/reconforge-test-binary".to_string(),
            args: vec![],
            stdin: None,
            timeout: Duration::from_secs(1),
        };
        let outcome = TokioProcessRunner.run(&invocation, idle_cancel()).await;
        assert!(matches!(outcome, RunOutcome::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_stdin_fed_to_child() {
        let invocation = Invocation {
            program: "/bin/cat".to_string(),
            args: vec![],
            stdin: Some("example.com".to_string()),
            timeout: Duration::from_secs(5),
        };
        let outcome = TokioProcessRunner.run(&invocation, idle_cancel()).await;

        match outcome {
            RunOutcome::Exited { stdout, .. } => assert_eq!(stdout.trim(), "example.com"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
