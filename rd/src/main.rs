//! rd - reminder daemon
//!
//! CLI entry point for running the daemon and checking definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, error, info, warn};

use reminders::cli::{Cli, Command, config_path_from_args, generate_after_help, log_file_path};
use reminders::condition::Condition;
use reminders::config::Config;
use reminders::daemon::Daemon;
use reminders::registry::Registry;
use reminders::scheduler::Scheduler;
use reminders::store::ConfigStore;

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, log_dir: &Path, stderr: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        let log_file = fs::File::create(log_file_path(log_dir)).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first so --config can feed the help footer
    let cli = parse_cli();

    // Load log settings from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    let log_dir = Config::load_log_dir(cli.config.as_ref());

    setup_logging(
        cli.log_level.as_deref(),
        config_log_level.as_deref(),
        &log_dir,
        cli.stderr,
    )
    .context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    info!(dir = %config.reminders_dir.display(), "Loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Run) => run_daemon(&config).await,
        Some(Command::Validate { dir }) => cmd_validate(&config, dir).await,
        Some(Command::Eval { condition, status }) => cmd_eval(&condition, &status),
    }
}

/// Parse arguments with a help footer that reflects the `--config` in use
fn parse_cli() -> Cli {
    let config_path = config_path_from_args(std::env::args_os().skip(1));
    let cmd = Cli::command().after_help(generate_after_help(config_path.as_ref()));
    Cli::from_arg_matches(&cmd.get_matches()).unwrap_or_else(|e| e.exit())
}

/// Evaluate a condition against a status value
fn cmd_eval(condition: &str, status: &str) -> Result<()> {
    let condition = Condition::parse(condition).map_err(|e| eyre!("Invalid condition: {}", e))?;
    let result = condition
        .evaluate(Some(status), Local::now().fixed_offset())
        .map_err(|e| eyre!("Evaluation failed: {}", e))?;

    println!("{}", result);
    Ok(())
}

/// Build every definition without scheduling anything
async fn cmd_validate(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.reminders_dir.clone());
    let store = ConfigStore::new(&dir, config.extensions.clone());
    let registry = Registry::with_builtins();
    let scheduler = Scheduler::new();

    let files = store
        .scan()
        .await
        .context(format!("Failed to read reminders directory {}", dir.display()))?;

    if files.is_empty() {
        println!("No definition files found in {}", dir.display());
        return Ok(());
    }

    let mut failed = 0;
    for file in files.keys() {
        let result = match store.load(file).await {
            Ok(Some(definition)) => registry
                .build_reminder(file, &definition, &scheduler)
                .map(|reminder| Some(reminder.condition().source().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(condition)) => println!("  {} {:<30} {}", "ok".green(), file, condition.dimmed()),
            Ok(None) => println!("  {} {:<30} {}", "skip".yellow(), file, "no reminder section".dimmed()),
            Err(e) => {
                failed += 1;
                println!("  {} {:<30} {}", "error".red(), file, e);
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{} of {} definition(s) failed validation", failed, files.len()));
    }
    Ok(())
}

/// Run the daemon main loop
async fn run_daemon(config: &Config) -> Result<()> {
    info!("Daemon starting...");

    let mut daemon = Daemon::from_config(config, Registry::with_builtins());
    let summary = daemon.load_all().await;
    for (file, reason) in &summary.failed {
        warn!(%file, %reason, "Definition not loaded");
    }

    let handle = daemon.handle();
    let daemon_task = tokio::spawn(daemon.run());

    info!("Daemon running. Press Ctrl+C to stop, SIGHUP to rescan definitions.");

    // Set up signal handlers
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    info!("SIGHUP received - rescanning definitions");
                    if let Err(e) = handle.rescan().await {
                        error!(error = %e, "Failed to request rescan");
                    }
                }
                _ = sigint.recv() => {
                    warn!("SIGINT received");
                    break;
                }
                _ = sigterm.recv() => {
                    warn!("SIGTERM received");
                    break;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On non-Unix, just wait for Ctrl+C
        tokio::signal::ctrl_c().await?;
    }

    info!("Daemon shutting down...");
    handle.shutdown().await?;
    daemon_task.await.context("Daemon task failed")?;

    Ok(())
}
