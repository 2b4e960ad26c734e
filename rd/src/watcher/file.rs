//! Watcher reading status from a local file

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Schedule, Watcher, WatcherError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWatcherConfig {
    /// File whose trimmed contents are the status
    pub path: PathBuf,
}

pub struct FileWatcher {
    path: PathBuf,
    schedules: Vec<Schedule>,
}

impl FileWatcher {
    pub fn new(config: FileWatcherConfig, schedules: Vec<Schedule>) -> Self {
        Self {
            path: config.path,
            schedules,
        }
    }
}

#[async_trait]
impl Watcher for FileWatcher {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn update(&self) -> Result<String, WatcherError> {
        debug!(path = %self.path.display(), "FileWatcher::update: called");
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| WatcherError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(content.trim().to_string())
    }

    fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }
}
