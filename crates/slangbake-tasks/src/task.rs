//! Compile task and result types

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use slangbake_core::{COMPILED_EXTENSION, LOG_DIR_NAME};

/// Which pass of the cascade a dispatch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// First pass with the configured target version
    Primary,
    /// Retry pass with the fallback target version
    Fallback,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// One preset to compile.
///
/// All paths derive from `(source_root, relative, output_root)` only, so a
/// retry of the same relative path writes to the same destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTask {
    source: PathBuf,
    relative: PathBuf,
    destination: PathBuf,
    log: PathBuf,
}

impl CompileTask {
    /// Build a task for a path relative to the source root
    pub fn new(source_root: &Path, output_root: &Path, relative: impl Into<PathBuf>) -> Self {
        let relative = relative.into();
        let source = source_root.join(&relative);
        let destination = output_root
            .join(&relative)
            .with_extension(COMPILED_EXTENSION);

        let mut log = output_root.join(LOG_DIR_NAME).join(&relative).into_os_string();
        log.push(".log");

        Self {
            source,
            relative,
            destination,
            log: PathBuf::from(log),
        }
    }

    /// Build a task from an absolute source path found under `source_root`.
    ///
    /// Returns `None` if the path is not inside the source root.
    pub fn from_source(source_root: &Path, output_root: &Path, source: &Path) -> Option<Self> {
        let relative = source.strip_prefix(source_root).ok()?;
        Some(Self::new(source_root, output_root, relative))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn log(&self) -> &Path {
        &self.log
    }
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Compiler exited with a non-zero status
    ExitCode(i32),
    /// Compiler was terminated by a signal
    Terminated,
    /// Compiler could not be started
    LaunchFailed(String),
    /// Waiting on the compiler failed
    WaitFailed(String),
    /// Compiler exceeded the per-task deadline and was killed
    TimedOut(Duration),
    /// Run was cancelled before or during this task
    Cancelled,
    /// The worker running this task panicked
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exited with code {}", code),
            Self::Terminated => write!(f, "terminated by signal"),
            Self::LaunchFailed(e) => write!(f, "failed to launch: {}", e),
            Self::WaitFailed(e) => write!(f, "failed to wait: {}", e),
            Self::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked(e) => write!(f, "worker panicked: {}", e),
        }
    }
}

/// Outcome of a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStatus {
    /// Compiler ran and exited successfully
    Compiled,
    /// Artifact already existed; compiler not invoked
    UpToDate,
    /// Task failed
    Failed(FailureReason),
}

impl CompileStatus {
    /// Check if this status represents success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Compiled | Self::UpToDate)
    }
}

/// Result of a single task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    /// Source path relative to the source root
    pub relative: PathBuf,
    /// Outcome
    pub status: CompileStatus,
    /// Compiler log; present only on failure
    pub log: Option<PathBuf>,
    /// Wall-clock time spent on the task
    #[serde(skip)]
    pub duration: Duration,
}

impl CompileResult {
    pub fn compiled(relative: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            relative: relative.into(),
            status: CompileStatus::Compiled,
            log: None,
            duration,
        }
    }

    pub fn up_to_date(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            status: CompileStatus::UpToDate,
            log: None,
            duration: Duration::ZERO,
        }
    }

    pub fn failed(
        relative: impl Into<PathBuf>,
        reason: FailureReason,
        log: Option<PathBuf>,
        duration: Duration,
    ) -> Self {
        Self {
            relative: relative.into(),
            status: CompileStatus::Failed(reason),
            log,
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
