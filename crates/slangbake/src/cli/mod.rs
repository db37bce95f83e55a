//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use commands::BakeCommand;

const AFTER_HELP: &str = "\
Outputs and logs:
  - Compiled shaders are written under OUT_DIR mirroring the source tree, with extension .oecompiledshader
  - Per-file compile logs are written under OUT_DIR/compile_logs/<relative>.log
  - Failures are listed in OUT_DIR/failed.txt, retried with Metal 2.3, and remaining failures listed in OUT_DIR/failed.2.3.txt

Settings may also come from slangbake.toml / slangbake.yaml in the current directory or a parent;
command-line arguments take precedence.";

/// Pre-compiles RetroArch slang shader presets (.slangp) into OpenEmu
/// compiled shader bundles (.oecompiledshader) for Metal
#[derive(Debug, Parser)]
#[command(name = "slangbake")]
#[command(author, version, about, long_about = None)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (default: search for slangbake.toml upwards)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub bake: BakeCommand,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self) -> anyhow::Result<()> {
        self.bake.execute(self)
    }

    /// Whether progress and summaries go to stdout as text
    pub fn is_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_source_dir_required() {
        assert!(Cli::try_parse_from(["slangbake"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["slangbake", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_global_flags_anywhere() {
        let cli = Cli::try_parse_from(["slangbake", "shaders", "--format", "json", "-q"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(!cli.is_text());
    }
}
