//! DaemonHandle - client interface to the running Daemon

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{ConfigEvent, DaemonRequest, ReminderStatus};

/// Cloneable handle for talking to the Daemon actor
#[derive(Clone)]
pub struct DaemonHandle {
    tx: mpsc::Sender<DaemonRequest>,
}

impl DaemonHandle {
    pub(crate) fn new(tx: mpsc::Sender<DaemonRequest>) -> Self {
        Self { tx }
    }

    /// Deliver a config event; events are applied in the order sent
    pub async fn config_event(&self, event: ConfigEvent) -> Result<()> {
        debug!(file = %event.file(), "DaemonHandle::config_event: called");
        self.send(DaemonRequest::Config(event)).await
    }

    /// Reload every definition file and drop reminders whose files vanished
    pub async fn rescan(&self) -> Result<()> {
        debug!("DaemonHandle::rescan: called");
        self.send(DaemonRequest::Rescan).await
    }

    /// Loaded reminders, sorted by name
    pub async fn snapshot(&self) -> Result<Vec<ReminderStatus>> {
        debug!("DaemonHandle::snapshot: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(DaemonRequest::Snapshot { reply }).await?;
        reply_rx.await.map_err(|_| eyre!("Daemon dropped snapshot request"))
    }

    /// Stop polling, cancel every job and wait for the actor to finish
    pub async fn shutdown(&self) -> Result<()> {
        debug!("DaemonHandle::shutdown: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(DaemonRequest::Shutdown { reply }).await?;
        reply_rx.await.map_err(|_| eyre!("Daemon dropped shutdown request"))
    }

    async fn send(&self, request: DaemonRequest) -> Result<()> {
        self.tx.send(request).await.map_err(|_| eyre!("Daemon channel closed"))
    }
}
