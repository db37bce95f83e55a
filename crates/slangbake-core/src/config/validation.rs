//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::BakeConfig;

/// Validate configuration
pub fn validate_config(config: &BakeConfig) -> Result<()> {
    debug!("validating configuration");

    if config.jobs == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "jobs".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.target_version.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "target_version".to_string(),
            message: "cannot be empty".to_string(),
        }
        .into());
    }

    if config.compiler.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: "compiler".to_string(),
            message: "cannot be empty; omit it to look up oeshaders on PATH".to_string(),
        }
        .into());
    }

    if config
        .output_dir
        .as_ref()
        .is_some_and(|dir| dir.as_os_str().is_empty())
    {
        return Err(ConfigError::InvalidValue {
            field: "output_dir".to_string(),
            message: "cannot be empty; omit it to use ./compiled_shaders".to_string(),
        }
        .into());
    }

    debug!("configuration validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BakeConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_jobs_invalid() {
        let config = BakeConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_compiler_invalid() {
        let config = BakeConfig {
            compiler: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_output_dir_invalid() {
        let config = BakeConfig {
            output_dir: Some(std::path::PathBuf::new()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_version_invalid() {
        let config = BakeConfig {
            target_version: " ".to_string(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
