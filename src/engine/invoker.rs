//! Process invoker for the external engine
//!
//! Runs one engine process to completion or timeout and captures its stdout
//! and stderr. The invoker never fails: spawn errors and timeouts are values
//! of [`InvocationOutcome`], which the normalizer turns into envelopes.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::config::DEFAULT_INVOKE_TIMEOUT_SECS;

/// How long to keep draining pipes after a forced kill
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Exit code reported when the process produced none (spawn failure, signal)
pub const NO_EXIT_CODE: i32 = -1;

/// A single engine invocation. Built once, consumed by [`invoke`].
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    argv: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl InvocationRequest {
    /// `argv[0]` is the program, the rest are its arguments
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_INVOKE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Raw result of an invocation, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The process was killed because it outlived its timeout
    TimedOut {
        stdout: String,
        stderr: String,
        timeout: Duration,
    },
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

impl InvocationOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            InvocationOutcome::TimedOut { .. } => NO_EXIT_CODE,
            InvocationOutcome::Completed { exit_code, .. } => *exit_code,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            InvocationOutcome::TimedOut { stdout, .. }
            | InvocationOutcome::Completed { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            InvocationOutcome::TimedOut { stderr, .. }
            | InvocationOutcome::Completed { stderr, .. } => stderr,
        }
    }
}

/// Output pipes still open on the child
struct Pipes {
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

/// Bytes captured so far, in arrival order per stream
#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Captured {
    fn into_text(self) -> (String, String) {
        (
            String::from_utf8_lossy(&self.stdout).into_owned(),
            String::from_utf8_lossy(&self.stderr).into_owned(),
        )
    }
}

enum DriveEvent {
    Stdout(std::io::Result<usize>),
    Stderr(std::io::Result<usize>),
    Exited(std::io::Result<ExitStatus>),
}

/// Run the request and wait for it to finish or time out
pub async fn invoke(request: &InvocationRequest) -> InvocationOutcome {
    let invocation_id = uuid::Uuid::new_v4();
    let started = Instant::now();

    let Some((program, args)) = request.argv.split_first() else {
        return spawn_failed("empty argument list");
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a timeout kill reaches grandchildren too
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(ref dir) = request.working_dir {
        cmd.current_dir(dir);
    }

    log::debug!(
        "[{}] Spawning engine {} with {} args (timeout {:?})",
        invocation_id,
        program,
        args.len(),
        request.timeout
    );

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            log::warn!("[{}] Failed to spawn {}: {}", invocation_id, program, e);
            return spawn_failed(&format!("Failed to spawn {}: {}", program, e));
        }
    };

    let mut pipes = Pipes {
        stdout: child.stdout.take(),
        stderr: child.stderr.take(),
    };
    let mut captured = Captured::default();

    // The clock only covers the process itself; it stops as soon as the child exits.
    let waited = tokio::time::timeout(
        request.timeout,
        wait_for_exit(&mut child, &mut pipes, &mut captured),
    )
    .await;

    match waited {
        Ok(Ok(status)) => {
            let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
            log::info!(
                "[{}] Engine exited with code {} after {:?}",
                invocation_id,
                exit_code,
                started.elapsed()
            );
            drain_bounded(invocation_id, &mut pipes, &mut captured).await;
            let (stdout, stderr) = captured.into_text();
            InvocationOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            }
        }
        Ok(Err(e)) => {
            log::warn!("[{}] Failed to wait for engine: {}", invocation_id, e);
            if let Err(e) = kill_tree(&mut child) {
                log::debug!("[{}] Kill failed: {}", invocation_id, e);
            }
            let (stdout, mut stderr) = captured.into_text();
            stderr.push_str(&format!("\nFailed to wait for process: {}", e));
            InvocationOutcome::Completed {
                exit_code: NO_EXIT_CODE,
                stdout,
                stderr,
            }
        }
        Err(_) => {
            log::warn!(
                "[{}] Engine timed out after {:?}, killing",
                invocation_id,
                request.timeout
            );
            if let Err(e) = kill_tree(&mut child) {
                log::debug!("[{}] Kill failed (already exited?): {}", invocation_id, e);
            }
            // Reap the child and pick up whatever was still buffered in the pipes
            let reaped = tokio::time::timeout(KILL_GRACE, async {
                let _ = child.wait().await;
                drain(&mut pipes, &mut captured).await;
            })
            .await;
            if reaped.is_err() {
                log::warn!(
                    "[{}] Engine pipes still open {:?} after kill, giving up",
                    invocation_id,
                    KILL_GRACE
                );
            }
            let (stdout, stderr) = captured.into_text();
            InvocationOutcome::TimedOut {
                stdout,
                stderr,
                timeout: request.timeout,
            }
        }
    }
}

fn spawn_failed(message: &str) -> InvocationOutcome {
    InvocationOutcome::Completed {
        exit_code: NO_EXIT_CODE,
        stdout: String::new(),
        stderr: message.to_string(),
    }
}

/// SIGKILL the child's whole process group, falling back to the child alone
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // The child leads its group, so the negated pid addresses every member
            let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
            if rc == 0 {
                return Ok(());
            }
            log::debug!(
                "Group kill of {} failed: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }
    child.start_kill()
}

/// Read both pipes while waiting for the process to exit.
///
/// Every await point is cancel safe, so dropping this future (on timeout)
/// keeps all bytes read so far in `captured` and the pipes usable for a
/// later [`drain`].
async fn wait_for_exit(
    child: &mut Child,
    pipes: &mut Pipes,
    captured: &mut Captured,
) -> std::io::Result<ExitStatus> {
    loop {
        let event = tokio::select! {
            read = read_some(&mut pipes.stdout, &mut captured.stdout) => DriveEvent::Stdout(read),
            read = read_some(&mut pipes.stderr, &mut captured.stderr) => DriveEvent::Stderr(read),
            exited = child.wait() => DriveEvent::Exited(exited),
        };

        match event {
            DriveEvent::Stdout(read) => close_on_eof(read, &mut pipes.stdout),
            DriveEvent::Stderr(read) => close_on_eof(read, &mut pipes.stderr),
            DriveEvent::Exited(exited) => return exited,
        }
    }
}

/// Read both pipes to EOF
async fn drain(pipes: &mut Pipes, captured: &mut Captured) {
    while pipes.stdout.is_some() || pipes.stderr.is_some() {
        let event = tokio::select! {
            read = read_some(&mut pipes.stdout, &mut captured.stdout) => DriveEvent::Stdout(read),
            read = read_some(&mut pipes.stderr, &mut captured.stderr) => DriveEvent::Stderr(read),
        };

        match event {
            DriveEvent::Stdout(read) => close_on_eof(read, &mut pipes.stdout),
            DriveEvent::Stderr(read) => close_on_eof(read, &mut pipes.stderr),
            DriveEvent::Exited(_) => {}
        }
    }
}

/// Drain after a natural exit; a leftover descendant holding a pipe open
/// only costs [`KILL_GRACE`]
async fn drain_bounded(invocation_id: uuid::Uuid, pipes: &mut Pipes, captured: &mut Captured) {
    if tokio::time::timeout(KILL_GRACE, drain(pipes, captured))
        .await
        .is_err()
    {
        log::warn!(
            "[{}] Engine exited but its pipes stayed open for {:?}, keeping what was read",
            invocation_id,
            KILL_GRACE
        );
    }
}

fn close_on_eof<R>(read: std::io::Result<usize>, pipe: &mut Option<R>) {
    if matches!(read, Ok(0) | Err(_)) {
        *pipe = None;
    }
}

/// Append the next chunk from `pipe` to `buf`; pends forever once the pipe is closed
async fn read_some<R: AsyncRead + Unpin>(
    pipe: &mut Option<R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    match pipe {
        Some(reader) => {
            buf.reserve(8 * 1024);
            reader.read_buf(buf).await
        }
        None => std::future::pending().await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> InvocationRequest {
        InvocationRequest::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ])
    }

    #[test]
    fn test_request_defaults() {
        let request = InvocationRequest::new(vec!["engine".to_string()]);
        assert_eq!(request.timeout(), Duration::from_secs(30));
        assert_eq!(request.argv(), ["engine".to_string()]);
    }

    #[tokio::test]
    async fn test_captures_both_streams() {
        let outcome = invoke(&sh("printf out; printf err 1>&2")).await;
        assert_eq!(
            outcome,
            InvocationOutcome::Completed {
                exit_code: 0,
                stdout: "out".to_string(),
                stderr: "err".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reports_nonzero_exit_code() {
        let outcome = invoke(&sh("printf '{}'; exit 3")).await;
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(outcome.stdout(), "{}");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_value() {
        let request = InvocationRequest::new(vec!["/no/such/engine-binary".to_string()]);
        let outcome = invoke(&request).await;
        assert_eq!(outcome.exit_code(), NO_EXIT_CODE);
        assert!(outcome.stdout().is_empty());
        assert!(outcome.stderr().contains("Failed to spawn"));
    }

    #[tokio::test]
    async fn test_empty_argv_is_a_value() {
        let outcome = invoke(&InvocationRequest::new(Vec::new())).await;
        assert_eq!(outcome.exit_code(), NO_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let request =
            sh("printf partial; printf diag 1>&2; sleep 30").with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let outcome = invoke(&request).await;

        assert!(started.elapsed() < Duration::from_millis(300) + KILL_GRACE + Duration::from_secs(1));
        match outcome {
            InvocationOutcome::TimedOut {
                stdout,
                stderr,
                timeout,
            } => {
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "diag");
                assert_eq!(timeout, Duration::from_millis(300));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let script = format!("(sleep 1; touch '{}') & sleep 30", marker.display());
        let request = sh(&script).with_timeout(Duration::from_millis(300));
        let started = Instant::now();

        let outcome = invoke(&request).await;
        assert!(matches!(outcome, InvocationOutcome::TimedOut { .. }));
        // Nothing left holding the pipes, so no grace period is spent
        assert!(started.elapsed() < Duration::from_millis(300) + KILL_GRACE);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_exit_stops_the_clock_even_with_a_lingering_descendant() {
        let request =
            sh(r#"printf '{"ok":true}'; sleep 30 & exit 0"#).with_timeout(Duration::from_secs(5));
        let started = Instant::now();

        let outcome = invoke(&request).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            outcome,
            InvocationOutcome::Completed {
                exit_code: 0,
                stdout: r#"{"ok":true}"#.to_string(),
                stderr: String::new(),
            }
        );
        assert!(matches!(
            crate::engine::normalize(&outcome),
            crate::engine::ResultEnvelope::Success { exit_code: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_large_output_is_captured_whole() {
        let outcome = invoke(&sh("head -c 200000 /dev/zero | tr '\\0' a")).await;
        assert_eq!(outcome.stdout().len(), 200_000);
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let request = sh("pwd").with_working_dir(Some(dir.path().to_path_buf()));
        let outcome = invoke(&request).await;
        let reported = std::fs::canonicalize(outcome.stdout().trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
