//! Bounded subprocess execution for validated commands.
//!
//! Commands are spawned as argument lists (the first token is the program,
//! the rest are argv) with no shell in between, so metacharacters in
//! arguments are inert even after sanitization. Stdout and stderr are
//! drained concurrently into capped buffers (draining continues past the
//! cap so a chatty child never deadlocks on a full pipe), and a wall-clock
//! timeout kills the child while keeping whatever output was captured.

use serde::Serialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::GatekeeperError;

/// Outcome of one subprocess run. Produced once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Captured stdout, at most `max_output_bytes` bytes.
    pub stdout: String,

    /// Captured stderr, at most `max_output_bytes` bytes.
    pub stderr: String,

    /// Output beyond the byte cap was dropped (never silently).
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,

    /// Exit code; `None` when the child was killed (timeout) or died on
    /// a signal.
    pub exit_code: Option<i32>,

    /// The wall-clock limit expired and the child was killed. Captured
    /// output up to that point is still present above.
    pub timed_out: bool,

    /// Elapsed wall-clock time.
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Spawns validated commands with bounded time and output.
pub struct ExecutionEngine {
    max_output_bytes: usize,
}

impl ExecutionEngine {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    /// Run a validated command to completion or timeout.
    ///
    /// A non-zero exit is a normal [`ExecutionReport`]; only a child that
    /// could not be started is an error. `kill_on_drop` guarantees the
    /// subprocess does not outlive this future even if the caller is
    /// cancelled mid-wait.
    pub async fn execute(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecutionReport, GatekeeperError> {
        let mut tokens = command.split_whitespace();
        let program = tokens.next().ok_or_else(|| GatekeeperError::Spawn {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;
        let args: Vec<&str> = tokens.collect();

        debug!("Executing {:?} (timeout: {:?})", command, timeout);

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GatekeeperError::Spawn {
                command: command.to_string(),
                source,
            })?;

        // Drain both pipes concurrently from the start; a child that writes
        // more than the pipe buffer before exiting must not block.
        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), self.max_output_bytes));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), self.max_output_bytes));

        let started = Instant::now();
        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(source)) => {
                return Err(GatekeeperError::Spawn {
                    command: command.to_string(),
                    source,
                });
            }
            Err(_elapsed) => {
                // Deadline expired: kill, then reap so nothing is orphaned.
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, true)
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        // Killing the child closed the pipes, so the readers finish promptly.
        let (stdout_bytes, stdout_truncated) =
            stdout_task.await.unwrap_or_else(|_| (Vec::new(), false));
        let (stderr_bytes, stderr_truncated) =
            stderr_task.await.unwrap_or_else(|_| (Vec::new(), false));

        if timed_out {
            debug!(
                "Command {:?} timed out after {:?}; {} stdout bytes kept",
                command,
                timeout,
                stdout_bytes.len()
            );
        }

        Ok(ExecutionReport {
            stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            stdout_truncated,
            stderr_truncated,
            exit_code,
            timed_out,
            duration_ms,
        })
    }
}

/// Read a pipe to EOF, keeping at most `cap` bytes.
///
/// Bytes past the cap are counted as truncation but still consumed, so the
/// child can always make progress.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };

    let mut buf: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    (buf, truncated)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(10_000)
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let report = engine()
            .execute("echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(report.success());
        assert_eq!(report.exit_code, Some(0));
        assert!(report.stdout.contains("hello"));
        assert!(!report.timed_out);
        assert!(!report.stdout_truncated);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_normal_report() {
        let report = engine()
            .execute("ls /deskgate-no-such-path", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!report.success());
        assert_ne!(report.exit_code, Some(0));
        assert!(!report.stderr.is_empty());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_failure() {
        let err = engine()
            .execute("deskgate-definitely-not-a-binary", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "spawn_failure");
    }

    #[tokio::test]
    async fn empty_command_is_a_spawn_failure() {
        let err = engine().execute("", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, GatekeeperError::Spawn { .. }));
    }

    #[tokio::test]
    async fn timeout_kills_and_reports() {
        let started = Instant::now();
        let report = engine()
            .execute("sleep 30", Duration::from_millis(300))
            .await
            .unwrap();
        assert!(report.timed_out);
        assert_eq!(report.exit_code, None);
        assert!(!report.success());
        // The kill must be prompt, not best-effort.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn output_beyond_cap_is_truncated_and_flagged() {
        let report = ExecutionEngine::new(64)
            .execute("seq 1 100000", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(report.stdout_truncated);
        assert!(report.stdout.len() <= 64);
        // Exit is still clean; truncation is not an error.
        assert!(!report.timed_out);
    }

    #[tokio::test]
    async fn partial_output_survives_a_timeout() {
        let report = ExecutionEngine::new(32)
            .execute("yes", Duration::from_millis(300))
            .await
            .unwrap();
        assert!(report.timed_out);
        assert!(report.stdout_truncated);
        assert!(!report.stdout.is_empty());
        assert!(report.stdout.len() <= 32);
    }

    #[tokio::test]
    async fn arguments_are_passed_as_a_list_not_a_shell_line() {
        // With a shell, `$(hostname)` would expand; as an argv element it
        // is passed through literally.
        let report = engine()
            .execute("echo $(hostname)", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(report.stdout.contains("$(hostname)"));
    }
}
