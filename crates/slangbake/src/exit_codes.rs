//! Exit codes for the CLI
//!
//! Compile failures never change the exit code; they are reported through
//! the manifests and per-file logs.

#![allow(dead_code)]

use slangbake_core::SlangbakeError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Interrupted by the user
pub const CANCELLED: i32 = 130;

/// Exit code for an error returned from the command
pub fn for_error(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<SlangbakeError>() {
        Some(e) if e.is_config() => CONFIG_ERROR,
        Some(SlangbakeError::Cancelled) => CANCELLED,
        _ => ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use slangbake_core::{ConfigError, TaskError};

    #[test]
    fn test_config_error_code() {
        let err: anyhow::Error =
            SlangbakeError::from(ConfigError::MissingField("compiler".to_string())).into();
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_config_error_code_through_context() {
        let result: Result<(), SlangbakeError> =
            Err(ConfigError::MissingField("compiler".to_string()).into());
        let err = result.context("loading config").unwrap_err();
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err: anyhow::Error = SlangbakeError::from(TaskError::WriteManifest {
            path: "/out/failed.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
        .into();
        assert_eq!(for_error(&err), ERROR);
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
        assert_ne!(SUCCESS, ERROR);
    }

    #[test]
    fn test_cancelled_code() {
        let err: anyhow::Error = SlangbakeError::Cancelled.into();
        assert_eq!(for_error(&err), CANCELLED);
    }
}
