//! Failure manifests written at the output root

use std::path::{Path, PathBuf};

use tracing::debug;

use slangbake_core::{Result, TaskError, FALLBACK_TARGET_VERSION};

/// File name of the primary-pass manifest
pub const PRIMARY_MANIFEST: &str = "failed.txt";

/// Prefix of each line in the primary-pass manifest
pub const FAILURE_PREFIX: &str = "FAILED: ";

/// File name of the fallback-pass manifest, e.g. `failed.2.3.txt`
pub fn fallback_manifest_name() -> String {
    format!("failed.{}.txt", FALLBACK_TARGET_VERSION)
}

/// Line format of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStyle {
    /// `FAILED: <path>` per line
    Prefixed,
    /// bare `<path>` per line
    Plain,
}

/// Ordered list of relative paths that failed a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureManifest {
    style: ManifestStyle,
    entries: Vec<PathBuf>,
}

impl FailureManifest {
    pub fn new(style: ManifestStyle, entries: Vec<PathBuf>) -> Self {
        Self { style, entries }
    }

    /// Render the manifest body; lines are joined with `\n`, no trailing newline
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| match self.style {
                ManifestStyle::Prefixed => format!("{}{}", FAILURE_PREFIX, entry.display()),
                ManifestStyle::Plain => entry.display().to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write the manifest, replacing any previous file at `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|source| TaskError::WriteManifest {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), entries = self.entries.len(), "wrote manifest");
        Ok(())
    }
}
