//! Compilation executor - runs the external shader compiler for one task

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use slangbake_core::{Result, RunConfiguration, TaskError};

use crate::task::{CompileResult, CompileTask, FailureReason};

/// Sub-command passed to the compiler
const COMPILE_SUBCOMMAND: &str = "compile";

/// Flag disabling the compiler's own cache; skipping is handled here
const DISABLE_CACHE_FLAG: &str = "--disable-cache";

/// Runs one compile task.
///
/// Compile failures are returned as failed [`CompileResult`]s. An `Err` is
/// reserved for filesystem errors that must abort the whole run.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &CompileTask, target_version: &str) -> Result<CompileResult>;
}

/// Sender side of a run-wide cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every executor holding the paired signal
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side of a run-wide cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the
    /// handle is dropped without cancelling
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Executor invoking `<program> compile <src> <dst> <version> --disable-cache`
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: PathBuf,
    timeout: Option<Duration>,
    cancel: CancelSignal,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            cancel: CancelSignal::never(),
        }
    }

    /// Create an executor using the configured compiler and timeout
    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(config.compiler()).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    async fn wait(&self, child: &mut Child) -> WaitOutcome {
        let wait = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                    Ok(status) => WaitOutcome::Exited(status),
                    Err(_) => WaitOutcome::TimedOut(limit),
                },
                None => WaitOutcome::Exited(child.wait().await),
            }
        };

        tokio::select! {
            outcome = wait => outcome,
            _ = self.cancel.cancelled() => WaitOutcome::Cancelled,
        }
    }
}

#[async_trait]
impl TaskExecutor for ProcessCompiler {
    async fn execute(&self, task: &CompileTask, target_version: &str) -> Result<CompileResult> {
        let start = Instant::now();
        prepare_directories(task)?;

        if task.destination().exists() {
            debug!(task = %task.relative().display(), "already compiled, skipping");
            return Ok(CompileResult::up_to_date(task.relative()));
        }

        // Leave any log from an earlier pass untouched
        if self.cancel.is_cancelled() {
            debug!(task = %task.relative().display(), "run cancelled before launch");
            return Ok(CompileResult::failed(
                task.relative(),
                FailureReason::Cancelled,
                None,
                start.elapsed(),
            ));
        }

        let log_path = task.log().to_path_buf();
        let log = File::create(&log_path).map_err(|source| TaskError::CreateLog {
            path: log_path.clone(),
            source,
        })?;

        let stderr = log.try_clone().map_err(|source| TaskError::CreateLog {
            path: log_path.clone(),
            source,
        })?;

        debug!(
            task = %task.relative().display(),
            version = target_version,
            "invoking compiler"
        );

        let mut child = match Command::new(&self.program)
            .arg(COMPILE_SUBCOMMAND)
            .arg(task.source())
            .arg(task.destination())
            .arg(target_version)
            .arg(DISABLE_CACHE_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "failed to launch compiler");
                append_log(
                    &log_path,
                    &format!("slangbake: failed to launch {}: {}", self.program.display(), e),
                );
                return Ok(failed(task, FailureReason::LaunchFailed(e.to_string()), start));
            }
        };

        let outcome = self.wait(&mut child).await;

        let reason = match outcome {
            WaitOutcome::Exited(Ok(status)) if status.success() => {
                return Ok(CompileResult::compiled(task.relative(), start.elapsed()));
            }
            WaitOutcome::Exited(Ok(status)) => match status.code() {
                Some(code) => FailureReason::ExitCode(code),
                None => FailureReason::Terminated,
            },
            WaitOutcome::Exited(Err(e)) => FailureReason::WaitFailed(e.to_string()),
            WaitOutcome::TimedOut(limit) => {
                kill(&mut child, task).await;
                append_log(
                    &log_path,
                    &format!("slangbake: killed after exceeding {}s timeout", limit.as_secs()),
                );
                FailureReason::TimedOut(limit)
            }
            WaitOutcome::Cancelled => {
                kill(&mut child, task).await;
                append_log(&log_path, "slangbake: killed, run cancelled");
                FailureReason::Cancelled
            }
        };

        debug!(task = %task.relative().display(), reason = %reason, "compile failed");
        Ok(failed(task, reason, start))
    }
}

fn failed(task: &CompileTask, reason: FailureReason, start: Instant) -> CompileResult {
    CompileResult::failed(
        task.relative(),
        reason,
        Some(task.log().to_path_buf()),
        start.elapsed(),
    )
}

/// Create the destination and log directories; concurrent creation is fine
fn prepare_directories(task: &CompileTask) -> Result<()> {
    for path in [task.destination(), task.log()] {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| TaskError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

async fn kill(child: &mut Child, task: &CompileTask) {
    if let Err(e) = child.kill().await {
        warn!(task = %task.relative().display(), error = %e, "failed to kill compiler");
    }
}

fn append_log(path: &Path, line: &str) {
    let written = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{}", line));
    if let Err(e) = written {
        warn!(path = %path.display(), error = %e, "failed to append to compile log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task_in(temp: &TempDir, relative: &str) -> CompileTask {
        let src = temp.path().join("src");
        let path = src.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "shaders = 1\n").unwrap();
        CompileTask::new(&src, &temp.path().join("out"), relative)
    }

    #[cfg(unix)]
    fn fake_compiler(temp: &TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = temp.path().join("fake-oeshaders");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_existing_artifact_skips_compiler() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "a/x.slangp");
        std::fs::create_dir_all(task.destination().parent().unwrap()).unwrap();
        std::fs::write(task.destination(), b"bundle").unwrap();

        // Program does not exist: any launch attempt would fail the task
        let compiler = ProcessCompiler::new(temp.path().join("does-not-exist"));
        let result = compiler.execute(&task, "2.4").await.unwrap();

        assert_eq!(result.status, crate::task::CompileStatus::UpToDate);
        assert!(result.log.is_none());
        assert!(!task.log().exists());
    }

    #[tokio::test]
    async fn test_launch_failure_is_failed_result() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "a/x.slangp");

        let compiler = ProcessCompiler::new(temp.path().join("does-not-exist"));
        let result = compiler.execute(&task, "2.4").await.unwrap();

        assert!(matches!(
            result.status,
            crate::task::CompileStatus::Failed(FailureReason::LaunchFailed(_))
        ));
        assert_eq!(result.log.as_deref(), Some(task.log()));
        let log = std::fs::read_to_string(task.log()).unwrap();
        assert!(log.contains("failed to launch"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_writes_artifact_and_passes_arguments() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "a/x.slangp");
        let compiler = fake_compiler(
            &temp,
            "echo \"args: $*\"\necho warning >&2\necho bundle > \"$3\"\nexit 0",
        );

        let result = ProcessCompiler::new(compiler)
            .execute(&task, "2.4")
            .await
            .unwrap();

        assert_eq!(result.status, crate::task::CompileStatus::Compiled);
        assert!(result.log.is_none());
        assert!(task.destination().exists());

        let log = std::fs::read_to_string(task.log()).unwrap();
        let expected = format!(
            "args: compile {} {} 2.4 --disable-cache",
            task.source().display(),
            task.destination().display()
        );
        assert!(log.contains(&expected), "log was: {}", log);
        assert!(log.contains("warning"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "b/y.slangp");
        let compiler = fake_compiler(&temp, "echo 'error: unsupported' >&2\nexit 3");

        let result = ProcessCompiler::new(compiler)
            .execute(&task, "2.4")
            .await
            .unwrap();

        assert_eq!(
            result.status,
            crate::task::CompileStatus::Failed(FailureReason::ExitCode(3))
        );
        assert_eq!(result.log.as_deref(), Some(task.log()));
        let log = std::fs::read_to_string(task.log()).unwrap();
        assert!(log.contains("error: unsupported"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_compiler() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "slow.slangp");
        let compiler = fake_compiler(&temp, "exec sleep 30");

        let result = ProcessCompiler::new(compiler)
            .with_timeout(Some(Duration::from_millis(200)))
            .execute(&task, "2.4")
            .await
            .unwrap();

        assert!(matches!(
            result.status,
            crate::task::CompileStatus::Failed(FailureReason::TimedOut(_))
        ));
        let log = std::fs::read_to_string(task.log()).unwrap();
        assert!(log.contains("timeout"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_in_flight_compiler() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "slow.slangp");
        let compiler = fake_compiler(&temp, "exec sleep 30");
        let (handle, signal) = cancel_pair();

        let executor = ProcessCompiler::new(compiler).with_cancel(signal);
        let run = executor.execute(&task, "2.4");
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        };
        let (result, _) = tokio::join!(run, cancel);

        assert_eq!(
            result.unwrap().status,
            crate::task::CompileStatus::Failed(FailureReason::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_launch() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "a/x.slangp");
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let result = ProcessCompiler::new(temp.path().join("does-not-exist"))
            .with_cancel(signal)
            .execute(&task, "2.4")
            .await
            .unwrap();

        assert_eq!(
            result.status,
            crate::task::CompileStatus::Failed(FailureReason::Cancelled)
        );
        assert!(result.log.is_none());
        assert!(!task.log().exists());
    }

    #[tokio::test]
    async fn test_cancelled_retry_keeps_previous_log() {
        let temp = TempDir::new().unwrap();
        let task = task_in(&temp, "a/x.slangp");
        std::fs::create_dir_all(task.log().parent().unwrap()).unwrap();
        std::fs::write(task.log(), "error: real diagnostic\n").unwrap();
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let result = ProcessCompiler::new(temp.path().join("does-not-exist"))
            .with_cancel(signal)
            .execute(&task, "2.3")
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(
            std::fs::read_to_string(task.log()).unwrap(),
            "error: real diagnostic\n"
        );
    }

    #[test]
    fn test_never_signal_is_not_cancelled() {
        assert!(!CancelSignal::never().is_cancelled());
    }
}
