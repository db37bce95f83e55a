//! Work dispatcher - bounded parallel execution with ordered results

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use slangbake_core::{Result, SlangbakeError};

use crate::executor::TaskExecutor;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::{CompileResult, CompileStatus, CompileTask, FailureReason, Pass};

/// Runs a list of tasks through an executor with at most `concurrency`
/// tasks in flight.
///
/// Results are reported and returned in task order. A task that finishes
/// early is held back until every task before it has been reported.
pub struct Dispatcher {
    executor: Arc<dyn TaskExecutor>,
    concurrency: usize,
    reporter: Arc<dyn TaskReporter>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        concurrency: usize,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
            reporter,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute all tasks with the given target version.
    ///
    /// Returns one result per task in input order. A fatal executor error
    /// aborts the outstanding tasks and is returned as-is.
    pub async fn dispatch(
        &self,
        pass: Pass,
        tasks: Vec<CompileTask>,
        target_version: &str,
    ) -> Result<Vec<CompileResult>> {
        let start = Instant::now();
        let total = tasks.len();

        self.reporter.report(&TaskEvent::PassStarted {
            pass,
            target_version: target_version.to_string(),
            task_count: total,
        });
        debug!(%pass, total, concurrency = self.concurrency, "dispatching tasks");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let version: Arc<str> = Arc::from(target_version);

        let handles: Vec<(PathBuf, JoinHandle<Result<CompileResult>>)> = tasks
            .into_iter()
            .map(|task| {
                let relative = task.relative().to_path_buf();
                let semaphore = semaphore.clone();
                let executor = self.executor.clone();
                let version = version.clone();

                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| SlangbakeError::other(format!("dispatcher closed: {}", e)))?;
                    executor.execute(&task, &version).await
                });

                (relative, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        let mut pending = handles.into_iter();

        while let Some((relative, handle)) = pending.next() {
            let result = match handle.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!(task = %relative.display(), error = %e, "aborting pass");
                    for (_, handle) in pending {
                        handle.abort();
                    }
                    return Err(e);
                }
                Err(e) => CompileResult::failed(
                    relative,
                    FailureReason::Panicked(e.to_string()),
                    None,
                    Duration::ZERO,
                ),
            };

            self.reporter.report(&TaskEvent::TaskFinished {
                pass,
                result: result.clone(),
            });
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let up_to_date = results
            .iter()
            .filter(|r| matches!(r.status, CompileStatus::UpToDate))
            .count();

        self.reporter.report(&TaskEvent::PassCompleted {
            pass,
            total,
            succeeded,
            failed: total - succeeded,
            up_to_date,
            duration: start.elapsed(),
        });

        Ok(results)
    }
}
