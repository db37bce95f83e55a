//! slangbake core - shared types, configuration and errors
//!
//! This crate holds the run configuration, the config file loader and the
//! error taxonomy used by the slangbake task engine and CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    find_config, load_config, load_config_or_default, BakeConfig, DEFAULT_OUTPUT_DIR,
};
pub use error::{ConfigError, DiscoveryError, Result, SlangbakeError, TaskError};
pub use types::{
    default_jobs, RunConfiguration, RunConfigurationBuilder, COMPILED_EXTENSION,
    DEFAULT_COMPILER, DEFAULT_TARGET_VERSION, EXCLUDED_FAMILIES, FALLBACK_TARGET_VERSION,
    LOG_DIR_NAME, SOURCE_EXTENSION,
};
