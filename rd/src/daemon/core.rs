//! Daemon actor implementation

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, warn};

use super::handle::DaemonHandle;
use super::messages::{ConfigEvent, DaemonRequest, ReminderStatus};
use super::poller::ConfigPoller;
use crate::config::Config;
use crate::registry::Registry;
use crate::reminder::Reminder;
use crate::scheduler::Scheduler;
use crate::store::{ConfigStore, Fingerprint};

/// What applying one config event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Registered,
    Replaced,
    Removed,
    /// File has no reminder section and nothing was loaded from it
    Skipped,
    /// Event for a file with no loaded reminder
    Ignored,
    /// Load or build failed; any previous reminder keeps running
    Failed(String),
}

/// Result of the initial directory load
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Owns the scheduler and every live reminder, keyed by definition basename
pub struct Daemon {
    store: ConfigStore,
    registry: Registry,
    scheduler: Scheduler,
    reload_interval: Duration,
    reminders: HashMap<String, Arc<Reminder>>,
    known: BTreeMap<String, Fingerprint>,
    rescan: Arc<Notify>,
    tx: mpsc::Sender<DaemonRequest>,
    rx: mpsc::Receiver<DaemonRequest>,
}

impl Daemon {
    pub fn new(store: ConfigStore, registry: Registry, reload_interval: Duration) -> Self {
        debug!(dir = %store.dir().display(), ?reload_interval, "Daemon::new: called");
        let (tx, rx) = mpsc::channel(256);
        Self {
            store,
            registry,
            scheduler: Scheduler::new(),
            reload_interval,
            reminders: HashMap::new(),
            known: BTreeMap::new(),
            rescan: Arc::new(Notify::new()),
            tx,
            rx,
        }
    }

    pub fn from_config(config: &Config, registry: Registry) -> Self {
        let store = ConfigStore::new(&config.reminders_dir, config.extensions.clone());
        Self::new(store, registry, config.reload_interval())
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle::new(self.tx.clone())
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn reminder(&self, file: &str) -> Option<&Arc<Reminder>> {
        self.reminders.get(file)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// Load every definition in the directory, registering check jobs
    ///
    /// Runs before [`Daemon::run`] starts the scheduler, so no check fires
    /// before all initial reminders are registered.
    pub async fn load_all(&mut self) -> LoadSummary {
        info!(dir = %self.store.dir().display(), "Loading reminders");
        let mut summary = LoadSummary::default();

        let files = match self.store.scan().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Cannot scan reminders directory, starting empty");
                return summary;
            }
        };

        for file in files.keys() {
            let result = self.store.load(file).await;
            match self
                .apply(ConfigEvent::Loaded {
                    file: file.clone(),
                    result,
                })
                .await
            {
                ApplyOutcome::Registered | ApplyOutcome::Replaced => summary.loaded.push(file.clone()),
                ApplyOutcome::Failed(reason) => summary.failed.push((file.clone(), reason)),
                _ => summary.skipped.push(file.clone()),
            }
        }

        self.known = files;
        info!(
            loaded = summary.loaded.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "Initial load complete"
        );
        summary
    }

    /// Apply one config event using remove-then-add
    ///
    /// The replacement is built before the old reminder is touched; if the
    /// build fails the old reminder keeps running.
    pub async fn apply(&mut self, event: ConfigEvent) -> ApplyOutcome {
        match event {
            ConfigEvent::Loaded { file, result } => {
                debug!(%file, "Daemon::apply: loaded");
                let definition = match result {
                    Ok(Some(definition)) => definition,
                    Ok(None) => {
                        if self.remove(&file).await {
                            info!(%file, "Definition no longer has a reminder section, removed");
                            return ApplyOutcome::Removed;
                        }
                        debug!(%file, "No reminder section, skipping");
                        return ApplyOutcome::Skipped;
                    }
                    Err(e) => {
                        error!(%file, error = %e, "Failed to load definition");
                        return ApplyOutcome::Failed(e.to_string());
                    }
                };

                let reminder = match self.registry.build_reminder(&file, &definition, &self.scheduler) {
                    Ok(reminder) => reminder,
                    Err(e) => {
                        error!(%file, error = %e, "Failed to build reminder");
                        return ApplyOutcome::Failed(e.to_string());
                    }
                };

                let replaced = self.remove(&file).await;
                let jobs = reminder.activate().await;
                self.reminders.insert(file.clone(), reminder);

                info!(%file, jobs, replaced, "Reminder registered");
                if replaced {
                    ApplyOutcome::Replaced
                } else {
                    ApplyOutcome::Registered
                }
            }
            ConfigEvent::Deleted { file } => {
                if self.remove(&file).await {
                    info!(%file, "Definition deleted, reminder removed");
                    ApplyOutcome::Removed
                } else {
                    info!(%file, "Deleted file had no loaded reminder, ignoring");
                    ApplyOutcome::Ignored
                }
            }
        }
    }

    /// Cancel a reminder's jobs and evict it; false when nothing was loaded
    async fn remove(&mut self, file: &str) -> bool {
        let Some(reminder) = self.reminders.remove(file) else {
            return false;
        };
        reminder.deactivate().await;
        true
    }

    /// Loaded reminders, sorted by name
    pub async fn snapshot(&self) -> Vec<ReminderStatus> {
        let mut statuses = Vec::with_capacity(self.reminders.len());
        for (name, reminder) in &self.reminders {
            let alert_active = match reminder.alerter() {
                Some(alerter) => alerter.is_active().await,
                None => false,
            };
            statuses.push(ReminderStatus {
                name: name.clone(),
                condition: reminder.condition().source().to_string(),
                check_jobs: reminder.job_count().await,
                alert_active,
            });
        }
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    async fn shutdown(&mut self) {
        info!(reminders = self.reminders.len(), "Daemon shutting down");
        for (_, reminder) in self.reminders.drain() {
            reminder.deactivate().await;
        }
        self.scheduler.shutdown().await;
    }

    /// Start the scheduler and poller, then process requests until shutdown
    pub async fn run(mut self) {
        self.scheduler.start();

        let poller = ConfigPoller::new(
            self.store.clone(),
            self.reload_interval,
            std::mem::take(&mut self.known),
            self.tx.clone(),
            self.rescan.clone(),
        );
        let poller_task = tokio::spawn(poller.run());
        info!(reminders = self.reminders.len(), "Daemon running");

        while let Some(request) = self.rx.recv().await {
            match request {
                DaemonRequest::Config(event) => {
                    self.apply(event).await;
                }
                DaemonRequest::Rescan => {
                    debug!("Daemon::run: rescan requested");
                    self.rescan.notify_one();
                }
                DaemonRequest::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot().await);
                }
                DaemonRequest::Shutdown { reply } => {
                    poller_task.abort();
                    self.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        info!("Daemon stopped");
    }
}
