//! Configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::DEFAULT_TIMEOUT_SECS;
use crate::types::DEFAULT_TARGET_VERSION;

/// Settings read from `slangbake.toml` / `slangbake.yaml`.
///
/// Every field is optional in the file; command-line arguments override
/// whatever is set here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Output directory for compiled bundles, logs and manifests.
    /// A relative path is taken from the directory holding the config file;
    /// `./compiled_shaders` under the working directory when unset.
    pub output_dir: Option<PathBuf>,

    /// Compiler executable, either a bare name looked up on `PATH` or a path
    /// relative to the config file; `oeshaders` on `PATH` when unset
    pub compiler: Option<String>,

    /// Primary Metal target version
    pub target_version: String,

    /// Parallel compile jobs; CPU count when unset
    pub jobs: Option<usize>,

    /// Skip heavy shader families (motion-interpolation, stereoscopic-3d, hdr, gpu).
    /// Off unless explicitly enabled.
    pub family_filter: bool,

    /// Per-task timeout in seconds, 0 disables it
    pub timeout_secs: u64,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            compiler: None,
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            jobs: None,
            family_filter: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BakeConfig {
    /// Timeout as a duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BakeConfig::default();
        assert!(config.output_dir.is_none());
        assert_eq!(config.target_version, "2.4");
        assert!(!config.family_filter);
        assert!(config.compiler.is_none());
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = BakeConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BakeConfig = toml::from_str("jobs = 3\nfamily_filter = true\n").unwrap();
        assert_eq!(config.jobs, Some(3));
        assert!(config.family_filter);
        assert_eq!(config.target_version, "2.4");
    }
}
