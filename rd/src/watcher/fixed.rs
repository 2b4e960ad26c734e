//! Watcher returning a fixed status

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Schedule, Watcher, WatcherError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticWatcherConfig {
    pub value: String,
}

/// Always reports the same status; handy for diagnostics and dry runs
pub struct StaticWatcher {
    value: String,
    schedules: Vec<Schedule>,
}

impl StaticWatcher {
    pub fn new(config: StaticWatcherConfig, schedules: Vec<Schedule>) -> Self {
        Self {
            value: config.value,
            schedules,
        }
    }
}

#[async_trait]
impl Watcher for StaticWatcher {
    fn kind(&self) -> &'static str {
        "static"
    }

    async fn update(&self) -> Result<String, WatcherError> {
        debug!(value = %self.value, "StaticWatcher::update: called");
        Ok(self.value.clone())
    }

    fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }
}
