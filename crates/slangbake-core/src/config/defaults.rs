//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "slangbake.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "slangbake.yaml";

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "compiled_shaders";

/// Default per-task timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".slangbake.toml",
        ".slangbake.yaml",
    ]
}
