//! Status watchers
//!
//! A watcher produces the current status string of a monitored resource on
//! demand and declares how often it should be polled. Concrete variants are
//! selected by the `type` discriminator of a definition (see `registry`).

mod error;
mod file;
mod fixed;
mod http;
mod mqtt;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::WatcherError;
pub use file::{FileWatcher, FileWatcherConfig};
pub use fixed::{StaticWatcher, StaticWatcherConfig};
pub use http::{HttpWatcher, HttpWatcherConfig};
pub use mqtt::{MqttWatcher, MqttWatcherConfig};

/// Default polling cadence when a definition declares no schedules
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A polling cadence; each schedule becomes one check job of a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(with = "humantime_serde")]
    pub every: Duration,
}

impl Schedule {
    pub fn every(every: Duration) -> Self {
        Self { every }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::every(DEFAULT_POLL_INTERVAL)
    }
}

/// Default schedule list: a single 60 second poll
pub fn default_schedules() -> Vec<Schedule> {
    vec![Schedule::default()]
}

/// Capability that produces the latest status of a resource
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Discriminator this watcher was built from
    fn kind(&self) -> &'static str;

    /// Fetch the current status
    async fn update(&self) -> Result<String, WatcherError>;

    /// Polling cadence declared at construction time
    fn schedules(&self) -> &[Schedule];

    /// Begin any background work the watcher needs, such as a subscription
    fn start(&self) {}

    /// Stop background work started by [`Watcher::start`]
    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_parses_humantime() {
        let schedule: Schedule = serde_yaml::from_str("every: 30s").unwrap();
        assert_eq!(schedule.every, Duration::from_secs(30));

        let schedule: Schedule = serde_yaml::from_str("every: 1h 30m").unwrap();
        assert_eq!(schedule.every, Duration::from_secs(5400));
    }

    #[test]
    fn test_default_schedule() {
        assert_eq!(default_schedules(), vec![Schedule::every(Duration::from_secs(60))]);
    }
}
