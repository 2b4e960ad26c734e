//! Daemon request types

use tokio::sync::oneshot;

use crate::definition::ReminderDefinition;
use crate::store::ConfigLoadError;

/// A change to one definition file, keyed by basename
#[derive(Debug)]
pub enum ConfigEvent {
    /// File was created or modified; `result` is its freshly loaded content
    Loaded {
        file: String,
        result: Result<Option<ReminderDefinition>, ConfigLoadError>,
    },
    /// File was deleted
    Deleted { file: String },
}

impl ConfigEvent {
    pub fn file(&self) -> &str {
        match self {
            ConfigEvent::Loaded { file, .. } | ConfigEvent::Deleted { file } => file,
        }
    }
}

/// One loaded reminder as seen by `snapshot`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderStatus {
    pub name: String,
    pub condition: String,
    pub check_jobs: usize,
    pub alert_active: bool,
}

/// Requests handled by the Daemon actor
#[derive(Debug)]
pub enum DaemonRequest {
    Config(ConfigEvent),
    Rescan,
    Snapshot {
        reply: oneshot::Sender<Vec<ReminderStatus>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
