//! Error types for slangbake

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using SlangbakeError
pub type Result<T> = std::result::Result<T, SlangbakeError>;

/// Main error type for slangbake operations
#[derive(Debug, Error)]
pub enum SlangbakeError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Source tree discovery errors
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Task execution errors that abort the whole run
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Run interrupted before it could finish
    #[error("Run cancelled")]
    Cancelled,

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while walking the source tree
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Source root does not exist
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// Source root exists but is not a directory
    #[error("Source path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Fatal errors raised while preparing or recording compile tasks
#[derive(Debug, Error)]
pub enum TaskError {
    /// Could not create an output or log directory
    #[error("Failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create a per-task log file
    #[error("Failed to create log file {path}")]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a failure manifest
    #[error("Failed to write manifest {path}")]
    WriteManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SlangbakeError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error stems from user-supplied configuration
    /// rather than from the run itself
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Discovery(_))
    }
}
