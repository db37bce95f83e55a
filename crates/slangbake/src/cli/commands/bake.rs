//! Bake command - compile every preset in a slang-shaders tree

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};
use console::style;
use tracing::{debug, warn};

use slangbake_core::{
    default_jobs, load_config, load_config_or_default, BakeConfig, RunConfiguration,
    SlangbakeError, DEFAULT_COMPILER, DEFAULT_OUTPUT_DIR,
};
use slangbake_tasks::{
    cancel_pair, CascadeReport, CompileTask, FailureCascade, Pass, ProcessCompiler,
    TaskDiscovery, TaskEvent, TaskReporter, TaskReporterRegistry,
};

use crate::cli::output::{self, path_style, version_style, Notice};
use crate::cli::{Cli, OutputFormat};

/// Family filter setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterMode {
    /// Skip heavy families
    On,
    /// Include every family
    Off,
    /// Same as on
    Auto,
}

impl FilterMode {
    pub fn enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Compile all presets under SRC_DIR
#[derive(Debug, Args)]
pub struct BakeCommand {
    /// Path to the 'slang-shaders' root containing .slangp files
    #[arg(value_name = "SRC_DIR")]
    pub source: PathBuf,

    /// Output directory for compiled shaders [default: ./compiled_shaders]
    #[arg(value_name = "OUT_DIR")]
    pub output: Option<PathBuf>,

    /// Path to the 'oeshaders' CLI [default: oeshaders on PATH]. Pass '.' or './' to use the default
    #[arg(value_name = "TOOL")]
    pub tool: Option<String>,

    /// Target Metal version [default: 2.4]. Failures are retried once with 2.3
    #[arg(value_name = "METAL")]
    pub metal: Option<String>,

    /// Number of parallel compile jobs [default: CPU count]
    #[arg(value_name = "JOBS")]
    pub jobs: Option<usize>,

    /// Skip heavy/incompatible families (motion-interpolation, stereoscopic-3d, hdr, gpu),
    /// intended for iOS/tvOS. Off unless given; bare --filter means on
    #[arg(
        long,
        value_enum,
        value_name = "MODE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on"
    )]
    pub filter: Option<FilterMode>,

    /// Include all shader families (same as --filter=off)
    #[arg(long, conflicts_with = "filter")]
    pub no_filter: bool,

    /// Per-file compile timeout in seconds, 0 disables [default: 600]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// List the presets that would be compiled without compiling them
    #[arg(long)]
    pub dry_run: bool,
}

impl BakeCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;

        let (file_config, config_path) = match &cli.config {
            Some(path) => {
                let config = load_config(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                (config, Some(path.clone()))
            }
            None => load_config_or_default(&cwd).context("Failed to load configuration")?,
        };
        let config_dir = match &config_path {
            Some(path) => {
                debug!(path = %path.display(), "using config file");
                config_directory(&cwd, path)
            }
            None => cwd.clone(),
        };

        let config = self.run_configuration(&file_config, &config_dir, &cwd)?;

        if cli.is_text() {
            print_header(&config);
        }

        let tasks = TaskDiscovery::from_config(&config).plan(config.output_root())?;

        if config.dry_run() {
            return print_plan(cli, &tasks);
        }

        let mut reporters = TaskReporterRegistry::new();
        if cli.is_text() {
            reporters.register(ConsoleReporter::stdout(cli.verbose));
        }

        let (cancel, signal) = cancel_pair();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling in-flight compiles");
                cancel.cancel();
            }
        });

        let executor = ProcessCompiler::from_config(&config).with_cancel(signal.clone());
        let cascade = FailureCascade::new(config.clone(), Arc::new(executor), Arc::new(reporters))
            .with_cancel(signal);
        let report = cascade.run(tasks).await?;

        match cli.format {
            OutputFormat::Json => print_json(&config, &report)?,
            OutputFormat::Text if !cli.quiet => print_summary(&config, &report),
            OutputFormat::Text => {}
        }

        if report.cancelled {
            return Err(SlangbakeError::Cancelled.into());
        }

        Ok(())
    }

    /// Merge arguments over the config file into the run configuration.
    ///
    /// Relative paths from arguments resolve against `cwd`; relative paths
    /// from the config file resolve against `config_dir`.
    pub fn run_configuration(
        &self,
        file: &BakeConfig,
        config_dir: &Path,
        cwd: &Path,
    ) -> slangbake_core::Result<RunConfiguration> {
        let output = match (&self.output, &file.output_dir) {
            (Some(output), _) => absolute(cwd, output),
            (None, Some(output)) => absolute(config_dir, output),
            (None, None) => cwd.join(DEFAULT_OUTPUT_DIR),
        };

        RunConfiguration::builder(absolute(cwd, &self.source))
            .output_root(output)
            .compiler(self.compiler_path(file, config_dir, cwd))
            .target_version(self.metal.as_deref().unwrap_or(&file.target_version))
            .concurrency(self.jobs.or(file.jobs).unwrap_or_else(default_jobs))
            .family_filter(self.filter_enabled(file))
            .timeout(self.timeout_setting(file))
            .dry_run(self.dry_run)
            .build()
    }

    /// TOOL wins unless it is '.' or './', then the config file, then the default
    fn compiler_path(&self, file: &BakeConfig, config_dir: &Path, cwd: &Path) -> PathBuf {
        let tool = self
            .tool
            .as_deref()
            .filter(|tool| !matches!(*tool, "." | "./"));

        match (tool, file.compiler.as_deref()) {
            (Some(tool), _) => resolve_compiler(tool, cwd),
            (None, Some(compiler)) => resolve_compiler(compiler, config_dir),
            (None, None) => resolve_compiler(DEFAULT_COMPILER, cwd),
        }
    }

    fn filter_enabled(&self, file: &BakeConfig) -> bool {
        if self.no_filter {
            return false;
        }
        self.filter
            .map(FilterMode::enabled)
            .unwrap_or(file.family_filter)
    }

    fn timeout_setting(&self, file: &BakeConfig) -> Option<Duration> {
        match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => file.timeout(),
        }
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Directory holding the config file, as an absolute path
fn config_directory(cwd: &Path, config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => absolute(cwd, dir),
        _ => cwd.to_path_buf(),
    }
}

/// Look a bare program name up on PATH; explicit paths resolve against `base`
fn resolve_compiler(tool: &str, base: &Path) -> PathBuf {
    let path = Path::new(tool);
    if path.components().count() > 1 {
        return absolute(base, path);
    }

    match which::which(tool) {
        Ok(found) => {
            debug!(tool, path = %found.display(), "resolved compiler");
            found
        }
        Err(e) => {
            warn!(tool, error = %e, "compiler not found on PATH");
            path.to_path_buf()
        }
    }
}

fn print_header(config: &RunConfiguration) {
    println!("{}", output::header("slangbake"));
    println!(
        "{}",
        output::key_value("Source", &config.source_root().display().to_string())
    );
    println!(
        "{}",
        output::key_value("Output", &config.output_root().display().to_string())
    );
    println!(
        "{}",
        output::key_value(
            "Tool",
            &format!(
                "{} (Metal {})",
                config.compiler().display(),
                version_style().apply_to(config.target_version())
            )
        )
    );
    println!(
        "{}",
        output::key_value("Jobs", &config.concurrency().to_string())
    );
    println!(
        "{}",
        output::key_value("Filter", if config.family_filter() { "on" } else { "off" })
    );
    println!();
}

fn print_plan(cli: &Cli, tasks: &[CompileTask]) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        let plan: Vec<serde_json::Value> = tasks
            .iter()
            .map(|task| {
                serde_json::json!({
                    "relative": task.relative(),
                    "source": task.source(),
                    "destination": task.destination(),
                    "log": task.log(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    for task in tasks {
        println!("  {} {}", style("▸").dim(), task.relative().display());
    }
    println!();
    output::emit(
        Notice::Info,
        &format!(
            "{} preset{} would be compiled",
            tasks.len(),
            plural(tasks.len())
        ),
    );
    println!(
        "{}",
        style("[DRY RUN - no presets will be compiled]").yellow().bold()
    );
    Ok(())
}

fn print_summary(config: &RunConfiguration, report: &CascadeReport) {
    println!();
    for (kind, message) in summary(config, report) {
        output::emit(kind, &message);
    }
}

/// End-of-run notices: manifests, log location, recoveries
fn summary(config: &RunConfiguration, report: &CascadeReport) -> Vec<(Notice, String)> {
    if report.discovered == 0 {
        return vec![(
            Notice::Warning,
            format!(
                "No .slangp presets found under {}",
                path_style().apply_to(config.source_root().display())
            ),
        )];
    }

    let Some(primary_manifest) = &report.primary_manifest else {
        return vec![(
            Notice::Success,
            format!(
                "All {} preset{} compiled",
                report.discovered,
                plural(report.discovered)
            ),
        )];
    };

    let mut notices = vec![(
        Notice::Warning,
        format!(
            "Failures logged in {} (see per-file logs under {})",
            path_style().apply_to(primary_manifest.display()),
            path_style().apply_to(config.log_root().display())
        ),
    )];

    if report.cancelled && report.fallback.is_empty() {
        notices.push((
            Notice::Warning,
            format!(
                "Cancelled before retrying with Metal {}",
                version_style().apply_to(config.fallback_version())
            ),
        ));
    }

    let recovered = report.recovered().len();
    if recovered > 0 {
        notices.push((
            Notice::Success,
            format!(
                "{} preset{} recovered with Metal {}",
                recovered,
                plural(recovered),
                version_style().apply_to(config.fallback_version())
            ),
        ));
    }

    if let Some(fallback_manifest) = &report.fallback_manifest {
        notices.push((
            Notice::Error,
            format!(
                "{} preset{} still failing, listed in {}",
                report.fallback_failures.len(),
                plural(report.fallback_failures.len()),
                path_style().apply_to(fallback_manifest.display())
            ),
        ));
    }

    notices
}

fn print_json(config: &RunConfiguration, report: &CascadeReport) -> anyhow::Result<()> {
    let summary = serde_json::json!({
        "source": config.source_root(),
        "output": config.output_root(),
        "target_version": config.target_version(),
        "fallback_version": config.fallback_version(),
        "passes": report.passes(),
        "clean": report.is_clean(),
        "recovered": report.recovered(),
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Prints one line per task as results arrive
struct ConsoleReporter {
    verbose: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleReporter {
    fn new(verbose: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            verbose,
            out: Mutex::new(out),
        }
    }

    fn stdout(verbose: bool) -> Self {
        Self::new(verbose, Box::new(std::io::stdout()))
    }

    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", text);
        }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PassStarted {
                pass: Pass::Fallback,
                target_version,
                task_count,
            } => {
                self.line("");
                self.line(&output::notice(
                    Notice::Info,
                    &format!(
                        "Retrying {} failed preset{} with Metal {}...",
                        task_count,
                        plural(*task_count),
                        version_style().apply_to(target_version)
                    ),
                ));
                self.line("");
            }
            TaskEvent::PassStarted { .. } => {}
            TaskEvent::TaskFinished { result, .. } => {
                self.line(&output::task_line(result, self.verbose));
            }
            TaskEvent::PassCompleted {
                pass,
                total,
                succeeded,
                failed,
                up_to_date,
                duration,
            } => {
                if self.verbose {
                    self.line(&format!(
                        "  {} {} pass: {}/{} succeeded, {} failed, {} up to date ({:.1}s)",
                        style("─").dim(),
                        pass,
                        succeeded,
                        total,
                        failed,
                        up_to_date,
                        duration.as_secs_f64()
                    ));
                }
            }
            TaskEvent::ManifestWritten { .. } => {}
        }
    }
}
