//! Subprocess executor - spawns the ray tracer binary
//!
//! `<binary> <input.json>` is run directly (no shell) from a fixed working
//! directory. stdout and stderr are drained while waiting so a chatty child
//! cannot block on a full pipe; only a bounded prefix of each is kept.
//!
//! On unix the child leads its own process group. Past the deadline the
//! whole group is killed, so helpers the binary forked die with it, and the
//! child is reaped before returning.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::ProcessExecutor;
use crate::config::ServerConfig;
use crate::types::ProcessOutcome;

/// Grace period for reaping a killed child and for draining pipes after exit
const REAP_GRACE: Duration = Duration::from_secs(2);

/// Bytes of stderr kept at each end in log lines
const STDERR_LOG_BYTES: usize = 1024;

/// Maximum stdout kept (10MB); a run printing more is a failure
pub const MAX_STDOUT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum stderr kept (1MB); the rest is counted and dropped
pub const MAX_STDERR_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    binary: PathBuf,
    working_dir: PathBuf,
    timeout: Duration,
    max_stdout: usize,
    max_stderr: usize,
}

impl SubprocessExecutor {
    pub fn new(binary: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            working_dir: working_dir.into(),
            timeout,
            max_stdout: MAX_STDOUT_BYTES,
            max_stderr: MAX_STDERR_BYTES,
        }
    }

    /// Override the output caps
    pub fn with_output_limits(mut self, max_stdout: usize, max_stderr: usize) -> Self {
        self.max_stdout = max_stdout;
        self.max_stderr = max_stderr;
        self
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.resolved_binary(), &config.working_dir, config.timeout)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ProcessExecutor for SubprocessExecutor {
    async fn execute(&self, input: &Path) -> ProcessOutcome {
        let start = Instant::now();

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    op = "ray_tracer.spawn_failed",
                    binary = %self.binary.display(),
                    error = %e,
                    "Failed to start ray tracer"
                );
                return ProcessOutcome::LaunchError {
                    message: e.to_string(),
                };
            }
        };

        let pid = child.id();
        info!(
            op = "ray_tracer.spawned",
            binary = %self.binary.display(),
            pid = ?pid,
            timeout_secs = self.timeout.as_secs(),
            "Ray tracer started"
        );

        let stdout_reader = spawn_reader(child.stdout.take(), self.max_stdout);
        let stderr_reader = spawn_reader(child.stderr.take(), self.max_stderr);

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_reader.abort();
                stderr_reader.abort();
                warn!(op = "ray_tracer.wait_failed", error = %e, "Waiting on ray tracer failed");
                return ProcessOutcome::LaunchError {
                    message: format!("failed to wait for ray tracer: {}", e),
                };
            }
            Err(_elapsed) => {
                let group_killed = kill_process_group(pid);
                let kill_success = child.kill().await.is_ok();
                let reap_success = tokio::time::timeout(REAP_GRACE, child.wait()).await.is_ok();

                // Grandchildren may still hold the pipes open
                stdout_reader.abort();
                stderr_reader.abort();

                warn!(
                    op = "ray_tracer.timeout",
                    timeout_secs = self.timeout.as_secs(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    group_killed = group_killed,
                    kill_success = kill_success,
                    reap_success = reap_success,
                    "Ray tracer timed out - child process killed"
                );
                return ProcessOutcome::TimedOut;
            }
        };

        let stdout = collect(stdout_reader).await;
        let stderr = collect(stderr_reader).await.into_text();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if status.success() && stdout.dropped > 0 {
            warn!(
                op = "ray_tracer.output_too_large",
                kept_bytes = stdout.text.len(),
                dropped_bytes = stdout.dropped,
                max_bytes = self.max_stdout,
                "Ray tracer output exceeded the cap"
            );
            ProcessOutcome::LaunchError {
                message: format!("ray tracer output exceeded {} bytes", self.max_stdout),
            }
        } else if status.success() {
            let stdout = stdout.text;
            info!(
                op = "ray_tracer.completed",
                elapsed_ms = elapsed_ms,
                stdout_len = stdout.len(),
                "Ray tracer finished"
            );
            ProcessOutcome::Success { stdout }
        } else {
            warn!(
                op = "ray_tracer.failed",
                exit_status = %status,
                elapsed_ms = elapsed_ms,
                stderr_trunc = %truncate_for_log(&stderr, STDERR_LOG_BYTES),
                "Ray tracer exited with error"
            );
            ProcessOutcome::NonZeroExit {
                code: status.code(),
                stderr,
            }
        }
    }

    fn executor_name(&self) -> &str {
        "subprocess"
    }
}

/// Output kept from one pipe, plus how many bytes past the cap were discarded
#[derive(Debug, Default)]
struct Captured {
    text: String,
    dropped: u64,
}

impl Captured {
    fn into_text(self) -> String {
        if self.dropped == 0 {
            self.text
        } else {
            format!("{}...[truncated {} bytes]", self.text, self.dropped)
        }
    }
}

fn spawn_reader<R>(handle: Option<R>, cap: usize) -> JoinHandle<Captured>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut handle) = handle else {
            return Captured::default();
        };
        let mut buf = Vec::new();
        let mut dropped = 0;
        match (&mut handle).take(cap as u64).read_to_end(&mut buf).await {
            Ok(_) if buf.len() >= cap => {
                // Keep the pipe drained so the child never blocks on write
                match tokio::io::copy(&mut handle, &mut tokio::io::sink()).await {
                    Ok(n) => dropped = n,
                    Err(e) => warn!(op = "ray_tracer.read_failed", error = %e, "Failed to drain child output"),
                }
            }
            Ok(_) => {}
            Err(e) => warn!(op = "ray_tracer.read_failed", error = %e, "Failed to read child output"),
        }
        Captured {
            text: String::from_utf8_lossy(&buf).into_owned(),
            dropped,
        }
    })
}

/// Output of a reader task. A grandchild holding the pipe open past the
/// grace period forfeits whatever is still unread.
async fn collect(reader: JoinHandle<Captured>) -> Captured {
    let abort = reader.abort_handle();
    match tokio::time::timeout(REAP_GRACE, reader).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(_)) => Captured::default(),
        Err(_) => {
            abort.abort();
            Captured::default()
        }
    }
}

/// SIGKILL every process in the child's group. The group id equals the
/// child's pid because it was spawned with `process_group(0)`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) -> bool {
    let Some(pgid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    unsafe { libc::kill(-pgid, libc::SIGKILL) == 0 }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) -> bool {
    false
}

/// Keep the head and tail of long output, cutting on char boundaries.
fn truncate_for_log(text: &str, keep: usize) -> String {
    if text.len() <= keep * 2 {
        return text.to_string();
    }
    let mut head_end = keep;
    while !text.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = text.len() - keep;
    while !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    format!(
        "{}...[truncated {} bytes]...{}",
        &text[..head_end],
        tail_start - head_end,
        &text[tail_start..]
    )
}
