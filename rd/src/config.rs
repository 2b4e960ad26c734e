//! Daemon configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of reminder definition files
    #[serde(rename = "reminders-dir")]
    pub reminders_dir: PathBuf,

    /// File extensions treated as definitions
    pub extensions: Vec<String>,

    /// How often the reminders directory is polled for changes
    #[serde(rename = "reload-interval-ms")]
    pub reload_interval_ms: u64,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Directory for the log file
    #[serde(rename = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminders_dir: PathBuf::from("./config/reminders"),
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            reload_interval_ms: 1000,
            log_level: None,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms.max(1))
    }

    /// Log directory, defaulting to the platform data dir
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .reminders.yml
        let local_config = PathBuf::from(".reminders.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/reminders/reminders.yml
        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Follows the same fallback chain as [`Config::load`] and never fails.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::candidates(config_path)
            .into_iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(&path).ok())
            .and_then(|config| config.log_level)
    }

    /// Log directory the same way, for setting up the log file
    pub fn load_log_dir(config_path: Option<&PathBuf>) -> PathBuf {
        Self::candidates(config_path)
            .into_iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(&path).ok())
            .map(|config| config.log_dir())
            .unwrap_or_else(default_log_dir)
    }

    fn candidates(config_path: Option<&PathBuf>) -> Vec<PathBuf> {
        match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(".reminders.yml"))
                .chain(user_config_path())
                .collect(),
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reminders").join("reminders.yml"))
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reminders")
        .join("logs")
}
