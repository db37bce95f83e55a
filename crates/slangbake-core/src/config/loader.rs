//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::BakeConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<BakeConfig> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: BakeConfig = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in the directory or its parents.
///
/// Names are tried in [`config_file_names`] order at each level; the first
/// match wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories).
///
/// Returns the defaults when no file exists; a file that exists but fails
/// to parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(BakeConfig, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            Ok((BakeConfig::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("slangbake.toml");
        std::fs::write(&config_path, "jobs = 2\n").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("slangbake.toml");
        let yaml_path = temp.path().join("slangbake.yaml");
        std::fs::write(&toml_path, "jobs = 2\n").unwrap();
        std::fs::write(&yaml_path, "jobs: 3\n").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), toml_path);
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".slangbake.yaml");
        std::fs::write(&config_path, "family_filter: true\n").unwrap();
        let nested = temp.path().join("shaders").join("crt");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested).unwrap(), config_path);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("slangbake.toml");
        std::fs::write(
            &config_path,
            "output_dir = \"build/shaders\"\ntarget_version = \"2.2\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("build/shaders")));
        assert_eq!(config.target_version, "2.2");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("slangbake.yaml");
        std::fs::write(&config_path, "compiler: /opt/bin/oeshaders\njobs: 8\n").unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.compiler.as_deref(), Some("/opt/bin/oeshaders"));
        assert_eq!(config.jobs, Some(8));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("slangbake.toml");
        std::fs::write(&config_path, "jobs = 0\n").unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let err = load_config(&temp.path().join("slangbake.toml")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, BakeConfig::default());
    }
}
