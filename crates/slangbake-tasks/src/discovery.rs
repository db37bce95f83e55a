//! Preset discovery in a slang-shaders tree

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use slangbake_core::{DiscoveryError, Result, RunConfiguration, SOURCE_EXTENSION};

use crate::task::CompileTask;

/// Walks a source tree and collects `.slangp` presets.
///
/// Directories whose name is in the excluded set are pruned together with
/// everything below them. The root itself is never pruned.
#[derive(Debug, Clone)]
pub struct TaskDiscovery {
    root: PathBuf,
    excluded: HashSet<String>,
}

impl TaskDiscovery {
    /// Create a discovery over `root` pruning the given family names
    pub fn new(root: impl Into<PathBuf>, excluded: HashSet<String>) -> Self {
        Self {
            root: root.into(),
            excluded,
        }
    }

    /// Create a discovery from the run configuration
    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(config.source_root(), config.excluded_families())
    }

    /// Discover all eligible preset files, in walk order
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(DiscoveryError::SourceNotFound(self.root.clone()).into());
        }
        if !self.root.is_dir() {
            return Err(DiscoveryError::NotADirectory(self.root.clone()).into());
        }

        debug!(
            root = %self.root.display(),
            excluded = self.excluded.len(),
            "discovering presets"
        );

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if is_preset(&entry) {
                files.push(entry.into_path());
            }
        }

        info!(count = files.len(), "discovered presets");
        Ok(files)
    }

    /// Discover presets and turn them into compile tasks against `output_root`
    pub fn plan(&self, output_root: &Path) -> Result<Vec<CompileTask>> {
        Ok(self
            .discover()?
            .iter()
            .filter_map(|path| CompileTask::from_source(&self.root, output_root, path))
            .collect())
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if self.excluded.is_empty() || entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }

        let pruned = entry
            .file_name()
            .to_str()
            .is_some_and(|name| self.excluded.contains(name));
        if pruned {
            debug!(path = %entry.path().display(), "pruning excluded family");
        }
        pruned
    }
}

fn is_preset(entry: &DirEntry) -> bool {
    !entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&format!(".{}", SOURCE_EXTENSION)))
}
