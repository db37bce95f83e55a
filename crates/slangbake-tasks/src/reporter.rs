//! Task execution reporting

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::task::{CompileResult, CompileStatus, Pass};

/// Events emitted while the cascade runs
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A dispatch pass is starting
    PassStarted {
        pass: Pass,
        target_version: String,
        task_count: usize,
    },
    /// A task result became visible, in submission order
    TaskFinished { pass: Pass, result: CompileResult },
    /// All tasks of a pass have been reported
    PassCompleted {
        pass: Pass,
        total: usize,
        succeeded: usize,
        failed: usize,
        up_to_date: usize,
        duration: Duration,
    },
    /// A failure manifest was written
    ManifestWritten {
        pass: Pass,
        path: PathBuf,
        entries: usize,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PassStarted {
                pass,
                target_version,
                task_count,
            } => {
                tracing::info!(%pass, %target_version, task_count, "pass started");
            }
            TaskEvent::TaskFinished { pass, result } => match &result.status {
                CompileStatus::Compiled => {
                    tracing::info!(
                        %pass,
                        task = %result.relative.display(),
                        "compiled in {:.1}s",
                        result.duration.as_secs_f64()
                    );
                }
                CompileStatus::UpToDate => {
                    tracing::debug!(%pass, task = %result.relative.display(), "up to date");
                }
                CompileStatus::Failed(reason) => {
                    tracing::warn!(
                        %pass,
                        task = %result.relative.display(),
                        log = ?result.log,
                        "failed: {}",
                        reason
                    );
                }
            },
            TaskEvent::PassCompleted {
                pass,
                total,
                succeeded,
                failed,
                up_to_date,
                duration,
            } => {
                tracing::info!(
                    "{} pass complete: {}/{} succeeded, {} failed, {} up to date ({:.1}s)",
                    pass,
                    succeeded,
                    total,
                    failed,
                    up_to_date,
                    duration.as_secs_f64()
                );
            }
            TaskEvent::ManifestWritten {
                pass,
                path,
                entries,
            } => {
                tracing::info!(%pass, path = %path.display(), entries, "manifest written");
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to several reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn register<R: TaskReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReporter for TaskReporterRegistry {
    fn report(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FailureReason;

    fn finished(relative: &str) -> TaskEvent {
        TaskEvent::TaskFinished {
            pass: Pass::Primary,
            result: CompileResult::compiled(relative, Duration::from_secs(1)),
        }
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        reporter.report(&finished("a/x.slangp"));
        reporter.report(&finished("b/y.slangp"));

        assert_eq!(reporter.events().len(), 2);
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;

        // Just verify it doesn't panic
        reporter.report(&finished("a/x.slangp"));
        reporter.report(&TaskEvent::TaskFinished {
            pass: Pass::Fallback,
            result: CompileResult::failed(
                "b/y.slangp",
                FailureReason::ExitCode(1),
                Some(PathBuf::from("/out/compile_logs/b/y.slangp.log")),
                Duration::ZERO,
            ),
        });
    }

    #[test]
    fn test_registry_defaults_to_tracing() {
        assert_eq!(TaskReporterRegistry::new().reporters.len(), 1);
    }

    #[test]
    fn test_registry_broadcasts() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut registry = TaskReporterRegistry::new();
        registry.reporters.push(collecting.clone());

        registry.report(&finished("a/x.slangp"));

        assert_eq!(registry.reporters.len(), 2);
        assert_eq!(collecting.events().len(), 1);
    }
}
