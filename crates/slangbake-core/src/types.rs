//! Run-level types shared by the engine and the CLI

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Extension of shader preset source files
pub const SOURCE_EXTENSION: &str = "slangp";

/// Extension of compiled shader bundles
pub const COMPILED_EXTENSION: &str = "oecompiledshader";

/// Subdirectory of the output root holding per-file compile logs
pub const LOG_DIR_NAME: &str = "compile_logs";

/// Compiler executable looked up on `PATH` when none is given
pub const DEFAULT_COMPILER: &str = "oeshaders";

/// Primary Metal target version
pub const DEFAULT_TARGET_VERSION: &str = "2.4";

/// More permissive Metal version used for the retry pass
pub const FALLBACK_TARGET_VERSION: &str = "2.3";

/// Shader families skipped when family filtering is enabled.
///
/// These are heavy or incompatible on mobile targets (iOS/tvOS).
pub const EXCLUDED_FAMILIES: [&str; 4] = ["motion-interpolation", "stereoscopic-3d", "hdr", "gpu"];

/// Default number of parallel jobs
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Immutable settings for a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    source_root: PathBuf,
    output_root: PathBuf,
    compiler: PathBuf,
    target_version: String,
    concurrency: usize,
    family_filter: bool,
    timeout: Option<Duration>,
    dry_run: bool,
}

impl RunConfiguration {
    /// Start building a configuration for the given source tree
    pub fn builder(source_root: impl Into<PathBuf>) -> RunConfigurationBuilder {
        RunConfigurationBuilder::new(source_root)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Root of the mirrored log tree
    pub fn log_root(&self) -> PathBuf {
        self.output_root.join(LOG_DIR_NAME)
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    /// Version used by the retry pass. Fixed, not configurable.
    pub fn fallback_version(&self) -> &'static str {
        FALLBACK_TARGET_VERSION
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn family_filter(&self) -> bool {
        self.family_filter
    }

    /// Family directory names pruned during discovery (empty when filtering is off)
    pub fn excluded_families(&self) -> HashSet<String> {
        if self.family_filter {
            EXCLUDED_FAMILIES.iter().map(|f| f.to_string()).collect()
        } else {
            HashSet::new()
        }
    }

    /// Per-task deadline for a single compiler invocation
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builder for [`RunConfiguration`]
#[derive(Debug, Clone)]
pub struct RunConfigurationBuilder {
    source_root: PathBuf,
    output_root: PathBuf,
    compiler: PathBuf,
    target_version: String,
    concurrency: usize,
    family_filter: bool,
    timeout: Option<Duration>,
    dry_run: bool,
}

impl RunConfigurationBuilder {
    fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: PathBuf::from(crate::config::DEFAULT_OUTPUT_DIR),
            compiler: PathBuf::from(DEFAULT_COMPILER),
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            concurrency: default_jobs(),
            family_filter: false,
            timeout: None,
            dry_run: false,
        }
    }

    pub fn output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    pub fn compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = version.into();
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn family_filter(mut self, enabled: bool) -> Self {
        self.family_filter = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<RunConfiguration> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jobs".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.target_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target_version".to_string(),
                message: "cannot be empty".to_string(),
            }
            .into());
        }

        if self.compiler.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("compiler".to_string()).into());
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                message: "use no timeout instead of a zero duration".to_string(),
            }
            .into());
        }

        Ok(RunConfiguration {
            source_root: self.source_root,
            output_root: self.output_root,
            compiler: self.compiler,
            target_version: self.target_version,
            concurrency: self.concurrency,
            family_filter: self.family_filter,
            timeout: self.timeout,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RunConfiguration::builder("/src").build().unwrap();
        assert_eq!(config.source_root(), Path::new("/src"));
        assert_eq!(config.output_root(), Path::new("compiled_shaders"));
        assert_eq!(config.compiler(), Path::new("oeshaders"));
        assert_eq!(config.target_version(), "2.4");
        assert_eq!(config.fallback_version(), "2.3");
        assert!(config.concurrency() > 0);
        assert!(!config.family_filter());
        assert!(config.timeout().is_none());
        assert!(!config.dry_run());
    }

    #[test]
    fn test_log_root_under_output() {
        let config = RunConfiguration::builder("/src")
            .output_root("/out")
            .build()
            .unwrap();
        assert_eq!(config.log_root(), PathBuf::from("/out/compile_logs"));
    }

    #[test]
    fn test_excluded_families_follow_filter_flag() {
        let off = RunConfiguration::builder("/src").build().unwrap();
        assert!(off.excluded_families().is_empty());

        let on = RunConfiguration::builder("/src")
            .family_filter(true)
            .build()
            .unwrap();
        let excluded = on.excluded_families();
        assert_eq!(excluded.len(), 4);
        for family in EXCLUDED_FAMILIES {
            assert!(excluded.contains(family));
        }
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let err = RunConfiguration::builder("/src")
            .concurrency(0)
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_empty_version_rejected() {
        assert!(RunConfiguration::builder("/src")
            .target_version("  ")
            .build()
            .is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(RunConfiguration::builder("/src")
            .timeout(Some(Duration::ZERO))
            .build()
            .is_err());
    }
}
