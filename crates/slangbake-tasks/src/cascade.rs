//! Failure cascade - primary pass, then one fallback pass over failures

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use slangbake_core::{Result, RunConfiguration, TaskError};

use crate::dispatcher::Dispatcher;
use crate::executor::{CancelSignal, TaskExecutor};
use crate::manifest::{fallback_manifest_name, FailureManifest, ManifestStyle, PRIMARY_MANIFEST};
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::{CompileResult, CompileTask, Pass};

/// Cascade states. Fallback can be entered at most once.
enum CascadeState {
    Primary(Vec<CompileTask>),
    EvaluatePrimary(Vec<CompileResult>),
    Fallback(Vec<PathBuf>),
    EvaluateFallback(Vec<CompileResult>),
    Done,
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct CascadeReport {
    /// Number of tasks handed to the primary pass
    pub discovered: usize,
    /// Primary pass results, in task order
    pub primary: Vec<CompileResult>,
    /// Fallback pass results, empty if the fallback never ran
    pub fallback: Vec<CompileResult>,
    /// Relative paths that failed the primary pass
    pub primary_failures: Vec<PathBuf>,
    /// Relative paths that also failed the fallback pass
    pub fallback_failures: Vec<PathBuf>,
    /// Primary manifest, if written
    pub primary_manifest: Option<PathBuf>,
    /// Fallback manifest, if written
    pub fallback_manifest: Option<PathBuf>,
    /// Run was cancelled; the fallback pass is skipped if it had not started
    pub cancelled: bool,
}

impl CascadeReport {
    /// Number of dispatch passes that ran (1 or 2)
    pub fn passes(&self) -> usize {
        if self.fallback.is_empty() {
            1
        } else {
            2
        }
    }

    /// Primary failures the fallback version fixed
    pub fn recovered(&self) -> Vec<&Path> {
        self.fallback
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.relative.as_path())
            .collect()
    }

    /// True if every task ended up compiled or up to date
    pub fn is_clean(&self) -> bool {
        self.primary_failures.len() == self.recovered().len()
    }
}

/// Runs the two-pass compile cascade for one configuration
pub struct FailureCascade {
    config: RunConfiguration,
    dispatcher: Dispatcher,
    reporter: Arc<dyn TaskReporter>,
    cancel: CancelSignal,
}

impl FailureCascade {
    pub fn new(
        config: RunConfiguration,
        executor: Arc<dyn TaskExecutor>,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        let dispatcher = Dispatcher::new(executor, config.concurrency(), reporter.clone());
        Self {
            config,
            dispatcher,
            reporter,
            cancel: CancelSignal::never(),
        }
    }

    /// Skip the fallback pass once this signal fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Run the cascade over already-discovered tasks
    pub async fn run(&self, tasks: Vec<CompileTask>) -> Result<CascadeReport> {
        self.prepare_output()?;

        let mut report = CascadeReport {
            discovered: tasks.len(),
            ..Default::default()
        };
        let mut state = CascadeState::Primary(tasks);

        loop {
            state = match state {
                CascadeState::Primary(tasks) => {
                    let results = self
                        .dispatcher
                        .dispatch(Pass::Primary, tasks, self.config.target_version())
                        .await?;
                    CascadeState::EvaluatePrimary(results)
                }
                CascadeState::EvaluatePrimary(results) => {
                    let failures = failed_paths(&results);
                    report.primary = results;

                    if failures.is_empty() {
                        debug!("no primary failures, skipping fallback");
                        CascadeState::Done
                    } else {
                        let path = self.write_manifest(
                            Pass::Primary,
                            PRIMARY_MANIFEST,
                            ManifestStyle::Prefixed,
                            &failures,
                        )?;
                        report.primary_manifest = Some(path);
                        report.primary_failures = failures.clone();

                        if self.cancel.is_cancelled() {
                            info!(
                                count = failures.len(),
                                "run cancelled, not retrying failures"
                            );
                            CascadeState::Done
                        } else {
                            CascadeState::Fallback(failures)
                        }
                    }
                }
                CascadeState::Fallback(failed) => {
                    info!(
                        count = failed.len(),
                        version = self.config.fallback_version(),
                        "retrying failures with fallback version"
                    );
                    let tasks = failed
                        .iter()
                        .map(|relative| {
                            CompileTask::new(
                                self.config.source_root(),
                                self.config.output_root(),
                                relative,
                            )
                        })
                        .collect();
                    let results = self
                        .dispatcher
                        .dispatch(Pass::Fallback, tasks, self.config.fallback_version())
                        .await?;
                    CascadeState::EvaluateFallback(results)
                }
                CascadeState::EvaluateFallback(results) => {
                    let failures = failed_paths(&results);
                    report.fallback = results;

                    if !failures.is_empty() {
                        let path = self.write_manifest(
                            Pass::Fallback,
                            &fallback_manifest_name(),
                            ManifestStyle::Plain,
                            &failures,
                        )?;
                        report.fallback_manifest = Some(path);
                        report.fallback_failures = failures;
                    }
                    CascadeState::Done
                }
                CascadeState::Done => break,
            };
        }

        report.cancelled = self.cancel.is_cancelled();
        Ok(report)
    }

    fn prepare_output(&self) -> Result<()> {
        for dir in [self.config.output_root().to_path_buf(), self.config.log_root()] {
            std::fs::create_dir_all(&dir).map_err(|source| TaskError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn write_manifest(
        &self,
        pass: Pass,
        name: &str,
        style: ManifestStyle,
        failures: &[PathBuf],
    ) -> Result<PathBuf> {
        let path = self.config.output_root().join(name);
        FailureManifest::new(style, failures.to_vec()).write(&path)?;
        self.reporter.report(&TaskEvent::ManifestWritten {
            pass,
            path: path.clone(),
            entries: failures.len(),
        });
        Ok(path)
    }
}

fn failed_paths(results: &[CompileResult]) -> Vec<PathBuf> {
    results
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.relative.clone())
        .collect()
}
