//! CLI command definitions and subcommands

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::Config;

/// Reminder daemon - watch resources and alert while conditions hold
#[derive(Debug, Parser)]
#[command(
    name = "rd",
    about = "Watch resources on a schedule and send repeating alerts while a condition holds",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Directory of reminder definitions (overrides config)
    #[arg(short = 'd', long = "reminders-dir", global = true)]
    pub reminders_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground (default)
    Run,

    /// Load every definition without scheduling and report problems
    Validate {
        /// Directory to validate (defaults to the configured reminders dir)
        dir: Option<PathBuf>,
    },

    /// Evaluate a condition against a status value
    Eval {
        /// Condition expression, e.g. '$status > 5'
        condition: String,

        /// Status value to evaluate against
        status: String,
    },
}

impl Cli {
    /// Apply command-line overrides to a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.reminders_dir {
            debug!(dir = %dir.display(), "Cli::apply_overrides: reminders dir");
            config.reminders_dir = dir.clone();
        }
    }
}

/// Path of the log file inside a log directory
pub fn log_file_path(log_dir: &std::path::Path) -> PathBuf {
    log_dir.join("reminders.log")
}

/// Find the `--config` value in raw arguments before clap parses them
///
/// Accepts `--config PATH`, `--config=PATH`, `-c PATH`, `-c=PATH` and `-cPATH`.
pub fn config_path_from_args<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
        let Some(arg) = arg.to_str() else {
            continue;
        };
        let inline = arg
            .strip_prefix("--config=")
            .or_else(|| arg.strip_prefix("-c="))
            .or_else(|| arg.strip_prefix("-c").filter(|value| !value.is_empty()));
        if let Some(value) = inline {
            return Some(PathBuf::from(value));
        }
    }
    None
}

/// Help footer showing where definitions and logs live
pub fn generate_after_help(config_path: Option<&PathBuf>) -> String {
    debug!("generate_after_help: called");
    let log_path = log_file_path(&Config::load_log_dir(config_path));

    let mut help = String::new();
    help.push_str("Definition files:\n");
    help.push_str("  One reminder per YAML file under a top-level 'reminder' key.\n");
    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", log_path.display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_eval() {
        let cli = Cli::parse_from(["rd", "eval", "$status > 5", "10"]);
        match cli.command {
            Some(Command::Eval { condition, status }) => {
                assert_eq!(condition, "$status > 5");
                assert_eq!(status, "10");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_reminders_dir_override() {
        let cli = Cli::parse_from(["rd", "--reminders-dir", "/srv/reminders", "run"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.reminders_dir, PathBuf::from("/srv/reminders"));
        assert!(matches!(cli.command, Some(Command::Run)));
    }

    #[test]
    fn test_config_path_from_args_forms() {
        let expected = Some(PathBuf::from("/etc/rd.yml"));
        assert_eq!(config_path_from_args(["rd", "--config", "/etc/rd.yml"]), expected);
        assert_eq!(config_path_from_args(["rd", "--config=/etc/rd.yml", "run"]), expected);
        assert_eq!(config_path_from_args(["rd", "run", "-c", "/etc/rd.yml"]), expected);
        assert_eq!(config_path_from_args(["rd", "-c=/etc/rd.yml"]), expected);
        assert_eq!(config_path_from_args(["rd", "-c/etc/rd.yml"]), expected);
    }

    #[test]
    fn test_config_path_from_args_absent() {
        assert_eq!(config_path_from_args(["rd", "run", "--stderr"]), None);
        assert_eq!(config_path_from_args(["rd", "--config"]), None);
        assert_eq!(config_path_from_args(["rd", "eval", "$status > 5", "10"]), None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["rd", "validate", "--stderr", "-l", "debug"]);
        assert!(cli.stderr);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::Validate { dir: None })));
    }
}
