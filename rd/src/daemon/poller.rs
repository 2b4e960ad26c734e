//! Config directory poller
//!
//! Compares the directory listing against the last known fingerprints on a
//! fixed interval and turns differences into [`ConfigEvent`]s. File reads
//! happen here, outside the Daemon actor.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};

use super::messages::{ConfigEvent, DaemonRequest};
use crate::store::{ConfigStore, Fingerprint};

pub struct ConfigPoller {
    store: ConfigStore,
    interval: Duration,
    known: BTreeMap<String, Fingerprint>,
    tx: mpsc::Sender<DaemonRequest>,
    rescan: Arc<Notify>,
    dir_missing: bool,
}

impl ConfigPoller {
    /// Create a poller seeded with the fingerprints of the initial load
    pub fn new(
        store: ConfigStore,
        interval: Duration,
        known: BTreeMap<String, Fingerprint>,
        tx: mpsc::Sender<DaemonRequest>,
        rescan: Arc<Notify>,
    ) -> Self {
        debug!(dir = %store.dir().display(), ?interval, known = known.len(), "ConfigPoller::new: called");
        Self {
            store,
            interval,
            known,
            tx,
            rescan,
            dir_missing: false,
        }
    }

    /// Scan once and send an event per changed file
    ///
    /// With `force`, every present file is reloaded whether or not it changed.
    /// Returns the number of events sent; fails only when the Daemon is gone.
    pub async fn poll_once(&mut self, force: bool) -> Result<usize> {
        let current = match self.store.scan().await {
            Ok(current) => {
                if self.dir_missing {
                    info!(dir = %self.store.dir().display(), "Reminders directory is readable again");
                    self.dir_missing = false;
                }
                current
            }
            Err(e) => {
                if !self.dir_missing {
                    warn!(error = %e, "Cannot scan reminders directory");
                    self.dir_missing = true;
                }
                // A directory that is confirmed gone takes its reminders with it
                match tokio::fs::try_exists(self.store.dir()).await {
                    Ok(false) => BTreeMap::new(),
                    _ => return Ok(0),
                }
            }
        };

        let mut sent = 0;
        for (file, fingerprint) in &current {
            if !force && self.known.get(file) == Some(fingerprint) {
                continue;
            }
            debug!(%file, force, "ConfigPoller::poll_once: file changed");
            let result = self.store.load(file).await;
            self.send(ConfigEvent::Loaded {
                file: file.clone(),
                result,
            })
            .await?;
            sent += 1;
        }

        let deleted: Vec<String> = self
            .known
            .keys()
            .filter(|file| !current.contains_key(*file))
            .cloned()
            .collect();
        for file in deleted {
            debug!(%file, "ConfigPoller::poll_once: file deleted");
            self.send(ConfigEvent::Deleted { file }).await?;
            sent += 1;
        }

        self.known = current;
        Ok(sent)
    }

    async fn send(&self, event: ConfigEvent) -> Result<()> {
        self.tx
            .send(DaemonRequest::Config(event))
            .await
            .map_err(|_| eyre!("Daemon channel closed"))
    }

    /// Poll until the Daemon goes away
    pub async fn run(mut self) {
        info!(dir = %self.store.dir().display(), interval_ms = self.interval.as_millis() as u64, "ConfigPoller started");

        loop {
            let force = tokio::select! {
                _ = tokio::time::sleep(self.interval) => false,
                _ = self.rescan.notified() => {
                    info!("Rescanning reminders directory");
                    true
                }
            };

            if let Err(e) = self.poll_once(force).await {
                debug!(error = %e, "ConfigPoller::run: stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEF: &str = "reminder:\n  condition: \"$status > 5\"\n";

    fn poller(dir: &TempDir, known: BTreeMap<String, Fingerprint>) -> (ConfigPoller, mpsc::Receiver<DaemonRequest>) {
        let (tx, rx) = mpsc::channel(16);
        let store = ConfigStore::new(dir.path(), vec!["yaml".to_string()]);
        (
            ConfigPoller::new(store, Duration::from_millis(10), known, tx, Arc::new(Notify::new())),
            rx,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<DaemonRequest>) -> Vec<(String, &'static str)> {
        let mut events = Vec::new();
        while let Ok(DaemonRequest::Config(event)) = rx.try_recv() {
            let kind = match &event {
                ConfigEvent::Loaded { result: Ok(Some(_)), .. } => "loaded",
                ConfigEvent::Loaded { result: Ok(None), .. } => "skipped",
                ConfigEvent::Loaded { result: Err(_), .. } => "error",
                ConfigEvent::Deleted { .. } => "deleted",
            };
            events.push((event.file().to_string(), kind));
        }
        events
    }

    #[tokio::test]
    async fn test_detects_create_modify_delete() {
        let dir = TempDir::new().unwrap();
        let (mut poller, mut rx) = poller(&dir, BTreeMap::new());

        std::fs::write(dir.path().join("a.yaml"), DEF).unwrap();
        assert_eq!(poller.poll_once(false).await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![("a.yaml".to_string(), "loaded")]);

        assert_eq!(poller.poll_once(false).await.unwrap(), 0);

        std::fs::write(dir.path().join("a.yaml"), "# emptied out, longer than before\n").unwrap();
        assert_eq!(poller.poll_once(false).await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![("a.yaml".to_string(), "skipped")]);

        std::fs::remove_file(dir.path().join("a.yaml")).unwrap();
        assert_eq!(poller.poll_once(false).await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![("a.yaml".to_string(), "deleted")]);
    }

    #[tokio::test]
    async fn test_seeded_files_are_not_reloaded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), DEF).unwrap();
        let store = ConfigStore::new(dir.path(), vec!["yaml".to_string()]);
        let known = store.scan().await.unwrap();

        let (mut poller, mut rx) = poller(&dir, known);
        assert_eq!(poller.poll_once(false).await.unwrap(), 0);

        assert_eq!(poller.poll_once(true).await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![("a.yaml".to_string(), "loaded")]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let store = ConfigStore::new(dir.path().join("missing"), vec!["yaml".to_string()]);
        let mut poller = ConfigPoller::new(store, Duration::from_millis(10), BTreeMap::new(), tx, Arc::new(Notify::new()));

        assert_eq!(poller.poll_once(false).await.unwrap(), 0);
        assert_eq!(poller.poll_once(false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_removed_directory_deletes_known_files() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("reminders");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.yaml"), DEF).unwrap();
        std::fs::write(dir.join("b.yaml"), DEF).unwrap();

        let store = ConfigStore::new(&dir, vec!["yaml".to_string()]);
        let known = store.scan().await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let mut poller = ConfigPoller::new(store, Duration::from_millis(10), known, tx, Arc::new(Notify::new()));

        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(poller.poll_once(false).await.unwrap(), 2);
        assert_eq!(
            drain(&mut rx),
            vec![("a.yaml".to_string(), "deleted"), ("b.yaml".to_string(), "deleted")]
        );
        assert_eq!(poller.poll_once(false).await.unwrap(), 0);

        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.yaml"), DEF).unwrap();
        assert_eq!(poller.poll_once(false).await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![("a.yaml".to_string(), "loaded")]);
    }

    #[tokio::test]
    async fn test_closed_channel_stops_poller() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), DEF).unwrap();
        let (mut poller, rx) = poller(&dir, BTreeMap::new());
        drop(rx);

        assert!(poller.poll_once(false).await.is_err());
    }
}
