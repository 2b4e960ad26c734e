//! Alerter lifecycle

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::scheduler::{JobId, Scheduler, job};

fn default_repeat_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_alert_on_activate() -> bool {
    true
}

/// Repeat settings shared by every alerter kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlerterConfig {
    pub message: String,

    #[serde(rename = "repeat-interval", with = "humantime_serde", default = "default_repeat_interval")]
    pub repeat_interval: Duration,

    /// Repeats after the first alert of an activation; 0 alerts once
    #[serde(rename = "max-repeat", default)]
    pub max_repeat: u32,

    #[serde(rename = "alert-on-activate", default = "default_alert_on_activate")]
    pub alert_on_activate: bool,
}

impl AlerterConfig {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            repeat_interval: default_repeat_interval(),
            max_repeat: 0,
            alert_on_activate: default_alert_on_activate(),
        }
    }
}

/// What a single `alert()` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The alerter was inactive; nothing was sent
    Suppressed,
    /// Sent; `exhausted` is true when this was the last alert of the activation
    Delivered { repeat: u32, exhausted: bool },
    /// Delivery failed; counting proceeded anyway
    Failed { repeat: u32, exhausted: bool },
}

/// Point-in-time view of alerter state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlerterSnapshot {
    pub active: bool,
    pub current_repeats: u32,
    pub jobs: usize,
}

#[derive(Default)]
struct AlerterState {
    active: bool,
    current_repeats: u32,
    initial_sent: bool,
    closed: bool,
    jobs: Vec<JobId>,
}

/// Repeating alert state machine over a [`Notifier`]
///
/// `inactive --activate()--> active`: optionally alerts at once, then registers
/// a repeat job. Every `alert()` while active delivers and counts; the alert
/// that brings `current_repeats` to `max_repeat` deactivates the alerter, so an
/// activation produces `max_repeat + 1` alerts in total.
///
/// `close()` retires the alerter for good: it deactivates and every later
/// `activate()` is refused.
pub struct Alerter {
    reminder: String,
    config: AlerterConfig,
    notifier: Arc<dyn Notifier>,
    scheduler: Scheduler,
    state: Mutex<AlerterState>,
    me: Weak<Alerter>,
}

impl Alerter {
    pub fn new(
        reminder: impl Into<String>,
        config: AlerterConfig,
        notifier: Arc<dyn Notifier>,
        scheduler: Scheduler,
    ) -> Arc<Self> {
        let reminder = reminder.into();
        debug!(%reminder, kind = notifier.kind(), ?config, "Alerter::new: called");
        Arc::new_cyclic(|me| Self {
            reminder,
            config,
            notifier,
            scheduler,
            state: Mutex::new(AlerterState::default()),
            me: me.clone(),
        })
    }

    pub fn config(&self) -> &AlerterConfig {
        &self.config
    }

    pub fn kind(&self) -> &'static str {
        self.notifier.kind()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn snapshot(&self) -> AlerterSnapshot {
        let state = self.state.lock().await;
        AlerterSnapshot {
            active: state.active,
            current_repeats: state.current_repeats,
            jobs: state.jobs.len(),
        }
    }

    /// Start an alert cycle; returns false if one is already running or the alerter is closed
    ///
    /// When the repeat job cannot be scheduled the activation is rolled back
    /// and nothing is sent.
    pub async fn activate(&self) -> bool {
        debug!(reminder = %self.reminder, "Alerter::activate: called");
        {
            let mut state = self.state.lock().await;
            if state.closed {
                debug!(reminder = %self.reminder, "Alerter::activate: closed, refusing");
                return false;
            }
            if state.active {
                debug!(reminder = %self.reminder, "Alerter::activate: already active");
                return false;
            }

            // Without an immediate alert the first tick delivers the initial one
            if self.config.max_repeat > 0 || !self.config.alert_on_activate {
                match self.schedule_repeats().await {
                    Ok(id) => state.jobs.push(id),
                    Err(e) => {
                        warn!(reminder = %self.reminder, error = %e, "Failed to schedule alert repeats, not activating");
                        return false;
                    }
                }
            }

            state.active = true;
            state.current_repeats = 0;
            state.initial_sent = false;
        }

        info!(reminder = %self.reminder, max_repeat = self.config.max_repeat, "Alerter activated");

        if self.config.alert_on_activate {
            self.alert().await;
        }
        true
    }

    async fn schedule_repeats(&self) -> Result<JobId, crate::scheduler::JobSchedulingError> {
        let me = self.me.clone();
        let scheduler = self.scheduler.downgrade();
        let own_id: Arc<OnceLock<JobId>> = Arc::new(OnceLock::new());

        let slot = own_id.clone();
        let id = self
            .scheduler
            .schedule(
                &format!("alert:{}", self.reminder),
                self.config.repeat_interval,
                job(move || {
                    let me = me.clone();
                    let scheduler = scheduler.clone();
                    let slot = slot.clone();
                    async move {
                        if let Some(alerter) = me.upgrade() {
                            alerter.alert().await;
                            return;
                        }
                        // Orphaned: nobody is left to cancel this job
                        if let (Some(id), Some(scheduler)) = (slot.get(), scheduler.upgrade()) {
                            debug!(job = %id, "Alerter dropped, cancelling its repeat job");
                            scheduler.cancel(id).await;
                        }
                    }
                }),
            )
            .await?;

        let _ = own_id.set(id);
        Ok(id)
    }

    /// Deliver one alert if active, counting it against `max_repeat`
    pub async fn alert(&self) -> AlertOutcome {
        let (repeat, exhausted) = {
            let mut state = self.state.lock().await;
            if !state.active {
                debug!(reminder = %self.reminder, "Alerter::alert: inactive, suppressing");
                return AlertOutcome::Suppressed;
            }

            let repeat = if state.initial_sent {
                state.current_repeats += 1;
                state.current_repeats
            } else {
                state.initial_sent = true;
                0
            };

            let exhausted = repeat >= self.config.max_repeat;
            if exhausted {
                debug!(reminder = %self.reminder, repeat, "Alerter::alert: max repeats reached");
                self.reset(&mut state).await;
            }
            (repeat, exhausted)
        };

        match self.notifier.deliver(&self.reminder, &self.config.message, repeat).await {
            Ok(()) => {
                debug!(reminder = %self.reminder, repeat, "Alert delivered");
                AlertOutcome::Delivered { repeat, exhausted }
            }
            Err(e) => {
                warn!(reminder = %self.reminder, repeat, error = %e, "Alert delivery failed");
                AlertOutcome::Failed { repeat, exhausted }
            }
        }
    }

    /// End the alert cycle; a no-op when already inactive
    pub async fn deactivate(&self) -> bool {
        debug!(reminder = %self.reminder, "Alerter::deactivate: called");
        let mut state = self.state.lock().await;
        if !state.active {
            debug!(reminder = %self.reminder, "Alerter::deactivate: already inactive");
            return false;
        }
        self.reset(&mut state).await;
        true
    }

    /// Deactivate and refuse every later activation
    pub async fn close(&self) {
        debug!(reminder = %self.reminder, "Alerter::close: called");
        let mut state = self.state.lock().await;
        state.closed = true;
        if state.active {
            self.reset(&mut state).await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    async fn reset(&self, state: &mut AlerterState) {
        state.active = false;
        state.current_repeats = 0;
        state.initial_sent = false;
        for id in state.jobs.drain(..) {
            self.scheduler.cancel(&id).await;
        }
        info!(reminder = %self.reminder, "Alerter deactivated");
    }
}
