//! Terminal output for bake runs

use console::{style, Style, StyledObject};

use slangbake_tasks::{CompileResult, CompileStatus};

/// Kind of a one-line notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    fn symbol(self) -> StyledObject<&'static str> {
        match self {
            Self::Success => style("✓").green().bold(),
            Self::Info => style("→").blue(),
            Self::Warning => style("!").yellow().bold(),
            Self::Error => style("✗").red().bold(),
        }
    }
}

/// Format a notice line
pub fn notice(kind: Notice, message: &str) -> String {
    format!("{} {}", kind.symbol(), message)
}

/// Print a notice; errors go to stderr
pub fn emit(kind: Notice, message: &str) {
    match kind {
        Notice::Error => eprintln!("{}", notice(kind, message)),
        _ => println!("{}", notice(kind, message)),
    }
}

/// Print an error message
pub fn error(message: &str) {
    emit(Notice::Error, message);
}

/// Progress line for a finished task: `OK: <path>` or `FAILED: <path>`.
///
/// Verbose lines carry the failure reason or an up-to-date marker.
pub fn task_line(result: &CompileResult, verbose: bool) -> String {
    let path = result.relative.display();
    match &result.status {
        CompileStatus::Compiled => format!("{} {}", ok_mark(), path),
        CompileStatus::UpToDate if verbose => {
            format!("{} {} {}", ok_mark(), path, style("(up to date)").dim())
        }
        CompileStatus::UpToDate => format!("{} {}", ok_mark(), path),
        CompileStatus::Failed(reason) if verbose => format!(
            "{} {} {}",
            failed_mark(),
            path,
            style(format!("({})", reason)).dim()
        ),
        CompileStatus::Failed(_) => format!("{} {}", failed_mark(), path),
    }
}

fn ok_mark() -> StyledObject<&'static str> {
    style("OK:").green()
}

fn failed_mark() -> StyledObject<&'static str> {
    style("FAILED:").red().bold()
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for Metal versions
pub fn version_style() -> Style {
    Style::new().green().bold()
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slangbake_tasks::FailureReason;
    use std::path::PathBuf;
    use std::time::Duration;

    fn plain(line: String) -> String {
        console::strip_ansi_codes(&line).into_owned()
    }

    fn failed(relative: &str) -> CompileResult {
        CompileResult::failed(
            relative,
            FailureReason::ExitCode(2),
            Some(PathBuf::from("/out/compile_logs/x.slangp.log")),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_task_lines() {
        let ok = CompileResult::compiled("a/x.slangp", Duration::ZERO);
        assert_eq!(plain(task_line(&ok, false)), "OK: a/x.slangp");
        assert_eq!(plain(task_line(&failed("b/y.slangp"), false)), "FAILED: b/y.slangp");
    }

    #[test]
    fn test_verbose_task_lines() {
        let skipped = CompileResult::up_to_date("a/x.slangp");
        assert_eq!(
            plain(task_line(&skipped, true)),
            "OK: a/x.slangp (up to date)"
        );
        assert!(plain(task_line(&failed("b/y.slangp"), true)).starts_with("FAILED: b/y.slangp ("));
    }

    #[test]
    fn test_notice_symbols() {
        assert_eq!(plain(notice(Notice::Success, "done")), "✓ done");
        assert_eq!(plain(notice(Notice::Error, "bad")), "✗ bad");
    }
}
