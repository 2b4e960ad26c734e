//! Reminder definition file types
//!
//! One reminder per file, under a top-level `reminder` key:
//!
//! ```yaml
//! reminder:
//!   condition: "$status > 5"
//!   watcher:
//!     type: http
//!     url: https://example.com/api
//!     json-path: data.count
//!     schedules:
//!       - every: 30s
//!   alerter:
//!     type: log
//!     message: count is high
//!     repeat-interval: 5m
//!     max-repeat: 2
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::alerter::AlerterConfig;
use crate::watcher::{Schedule, default_schedules};

/// Top-level document of a definition file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub reminder: Option<ReminderDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDefinition {
    pub condition: String,

    /// End a running alert cycle when a check finds the condition false
    #[serde(rename = "deactivate-when-clear", default)]
    pub deactivate_when_clear: bool,

    #[serde(default)]
    pub watcher: Option<WatcherSpec>,

    #[serde(default)]
    pub alerter: Option<AlerterSpec>,
}

/// Watcher section; `options` holds the variant-specific keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default = "default_schedules")]
    pub schedules: Vec<Schedule>,

    #[serde(flatten)]
    pub options: Mapping,
}

/// Alerter section; repeat settings are common, `options` is variant-specific
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlerterSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub settings: AlerterConfig,

    #[serde(flatten)]
    pub options: Mapping,
}
