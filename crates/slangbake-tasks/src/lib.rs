//! slangbake tasks - shader preset compile orchestration
//!
//! This crate discovers `.slangp` presets, runs the external compiler over
//! them with bounded parallelism, and retries failures once with a more
//! permissive Metal version.

pub mod cascade;
pub mod discovery;
pub mod dispatcher;
pub mod executor;
pub mod manifest;
pub mod reporter;
pub mod task;

pub use cascade::{CascadeReport, FailureCascade};
pub use discovery::TaskDiscovery;
pub use dispatcher::Dispatcher;
pub use executor::{cancel_pair, CancelHandle, CancelSignal, ProcessCompiler, TaskExecutor};
pub use manifest::{FailureManifest, ManifestStyle};
pub use reporter::{TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use task::{CompileResult, CompileStatus, CompileTask, FailureReason, Pass};
