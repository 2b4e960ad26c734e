//! Reminder: one condition, one watcher, one alerter

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Local;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::alerter::Alerter;
use crate::condition::{Condition, EvaluationError};
use crate::scheduler::{JobId, Scheduler, job};
use crate::watcher::{Schedule, Watcher, WatcherError, default_schedules};

/// A scheduled check did not produce a verdict
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Result of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Condition held; `activated` is false when the alerter was already running
    Triggered { activated: bool },
    /// Condition did not hold; `deactivated` is true when a running alert cycle was ended
    Clear { deactivated: bool },
    /// The reminder was deactivated while the check ran; the verdict was dropped
    Retired,
}

/// A reminder bound to its source definition
///
/// The watcher and alerter are fixed at construction; a changed definition
/// produces a new `Reminder` rather than mutating this one. Once deactivated a
/// reminder is retired and cannot be activated again.
pub struct Reminder {
    name: String,
    condition: Condition,
    watcher: Option<Arc<dyn Watcher>>,
    alerter: Option<Arc<Alerter>>,
    scheduler: Scheduler,
    deactivate_when_clear: bool,
    jobs: Mutex<Vec<JobId>>,
    retired: AtomicBool,
    me: Weak<Reminder>,
}

impl Reminder {
    pub fn new(
        name: impl Into<String>,
        condition: Condition,
        watcher: Option<Arc<dyn Watcher>>,
        alerter: Option<Arc<Alerter>>,
        scheduler: Scheduler,
        deactivate_when_clear: bool,
    ) -> Arc<Self> {
        let name = name.into();
        debug!(%name, %condition, has_watcher = watcher.is_some(), has_alerter = alerter.is_some(), "Reminder::new: called");
        Arc::new_cyclic(|me| Self {
            name,
            condition,
            watcher,
            alerter,
            scheduler,
            deactivate_when_clear,
            jobs: Mutex::new(Vec::new()),
            retired: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn alerter(&self) -> Option<&Arc<Alerter>> {
        self.alerter.as_ref()
    }

    /// Polling cadence: the watcher's schedules, or the default when there is no watcher
    pub fn schedules(&self) -> Vec<Schedule> {
        match &self.watcher {
            Some(watcher) => watcher.schedules().to_vec(),
            None => default_schedules(),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Number of check jobs currently registered
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Pull the status, evaluate the condition and drive the alerter
    pub async fn check(&self) -> Result<CheckOutcome, CheckError> {
        debug!(reminder = %self.name, "Reminder::check: called");
        let Some(watcher) = &self.watcher else {
            return Err(EvaluationError::StatusUnavailable(format!("reminder '{}' has no watcher", self.name)).into());
        };

        let status = watcher.update().await?;
        if self.is_retired() {
            debug!(reminder = %self.name, "Reminder::check: retired during update, dropping verdict");
            return Ok(CheckOutcome::Retired);
        }

        let now = Local::now().fixed_offset();
        let holds = self.condition.evaluate(Some(&status), now)?;
        debug!(reminder = %self.name, %status, holds, "Reminder::check: evaluated");

        if holds {
            // A closed alerter refuses, covering a retire that lands after the check above
            let activated = match &self.alerter {
                Some(alerter) => alerter.activate().await,
                None => false,
            };
            if activated {
                info!(reminder = %self.name, %status, "Condition met, alert activated");
            }
            return Ok(CheckOutcome::Triggered { activated });
        }

        let deactivated = match &self.alerter {
            Some(alerter) if self.deactivate_when_clear => alerter.deactivate().await,
            _ => false,
        };
        if deactivated {
            info!(reminder = %self.name, %status, "Condition cleared, alert deactivated");
        }
        Ok(CheckOutcome::Clear { deactivated })
    }

    /// Register one check job per schedule; a no-op when jobs already exist
    pub async fn activate(&self) -> usize {
        debug!(reminder = %self.name, "Reminder::activate: called");
        let mut jobs = self.jobs.lock().await;
        if self.is_retired() {
            debug!(reminder = %self.name, "Reminder::activate: retired");
            return 0;
        }
        if !jobs.is_empty() {
            debug!(reminder = %self.name, "Reminder::activate: already active");
            return 0;
        }

        if let Some(watcher) = &self.watcher {
            watcher.start();
        }

        for schedule in self.schedules() {
            let me = self.me.clone();
            let callback = job(move || {
                let me = me.clone();
                async move {
                    let Some(reminder) = me.upgrade() else {
                        return;
                    };
                    if let Err(e) = reminder.check().await {
                        warn!(reminder = %reminder.name, error = %e, "Check failed");
                    }
                }
            });

            match self
                .scheduler
                .schedule(&format!("check:{}", self.name), schedule.every, callback)
                .await
            {
                Ok(id) => jobs.push(id),
                Err(e) => warn!(reminder = %self.name, error = %e, "Failed to schedule check"),
            }
        }

        info!(reminder = %self.name, jobs = jobs.len(), "Reminder activated");
        jobs.len()
    }

    /// Retire the reminder: cancel every check job and close the alerter
    ///
    /// Checks already running finish without activating anything.
    pub async fn deactivate(&self) {
        debug!(reminder = %self.name, "Reminder::deactivate: called");
        self.retired.store(true, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().await;
        for id in jobs.drain(..) {
            self.scheduler.cancel(&id).await;
        }
        drop(jobs);

        if let Some(watcher) = &self.watcher {
            watcher.stop();
        }
        if let Some(alerter) = &self.alerter {
            alerter.close().await;
        }
        info!(reminder = %self.name, "Reminder deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerter::{AlerterConfig, DeliveryError, Notifier};
    use crate::watcher::{StaticWatcher, StaticWatcherConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Notifier for Counting {
        fn kind(&self) -> &'static str {
            "counting"
        }

        async fn deliver(&self, _: &str, _: &str, _: u32) -> Result<(), DeliveryError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Watcher for Failing {
        fn kind(&self) -> &'static str {
            "failing"
        }

        async fn update(&self) -> Result<String, WatcherError> {
            Err(WatcherError::PathNotFound {
                path: "data".to_string(),
            })
        }

        fn schedules(&self) -> &[Schedule] {
            &[]
        }
    }

    /// Counts start/stop calls of a subscription-style watcher
    #[derive(Default)]
    struct Subscribed {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    #[async_trait]
    impl Watcher for Subscribed {
        fn kind(&self) -> &'static str {
            "subscribed"
        }

        async fn update(&self) -> Result<String, WatcherError> {
            Ok("1".to_string())
        }

        fn schedules(&self) -> &[Schedule] {
            &[]
        }

        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn static_watcher(value: &str, schedules: Vec<Schedule>) -> Arc<dyn Watcher> {
        Arc::new(StaticWatcher::new(
            StaticWatcherConfig {
                value: value.to_string(),
            },
            schedules,
        ))
    }

    fn reminder(condition: &str, value: &str, deactivate_when_clear: bool) -> (Arc<Reminder>, Arc<Counting>) {
        let scheduler = Scheduler::new();
        let notifier = Arc::new(Counting::default());
        let config = AlerterConfig {
            max_repeat: 2,
            repeat_interval: Duration::from_secs(3600),
            ..AlerterConfig::new("high")
        };
        let alerter = Alerter::new("r", config, notifier.clone(), scheduler.clone());
        let reminder = Reminder::new(
            "r",
            Condition::parse(condition).unwrap(),
            Some(static_watcher(value, default_schedules())),
            Some(alerter),
            scheduler,
            deactivate_when_clear,
        );
        (reminder, notifier)
    }

    #[tokio::test]
    async fn test_check_triggers_once() {
        let (reminder, notifier) = reminder("$status > 5", "10", false);

        assert_eq!(
            reminder.check().await.unwrap(),
            CheckOutcome::Triggered { activated: true }
        );
        assert_eq!(
            reminder.check().await.unwrap(),
            CheckOutcome::Triggered { activated: false }
        );
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_leaves_alerter_running_by_default() {
        let (reminder, _) = reminder("$status > 5", "1", false);
        reminder.alerter().unwrap().activate().await;

        assert_eq!(
            reminder.check().await.unwrap(),
            CheckOutcome::Clear { deactivated: false }
        );
        assert!(reminder.alerter().unwrap().is_active().await);
    }

    #[tokio::test]
    async fn test_clear_deactivates_when_configured() {
        let (reminder, _) = reminder("$status > 5", "1", true);
        reminder.alerter().unwrap().activate().await;

        assert_eq!(
            reminder.check().await.unwrap(),
            CheckOutcome::Clear { deactivated: true }
        );
        assert!(!reminder.alerter().unwrap().is_active().await);
    }

    #[tokio::test]
    async fn test_evaluation_error_is_reported() {
        let (reminder, notifier) = reminder("$status > 5", "open", false);
        assert!(matches!(
            reminder.check().await,
            Err(CheckError::Evaluation(EvaluationError::TypeMismatch { .. }))
        ));
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_watcher_error_is_reported() {
        let reminder = Reminder::new(
            "r",
            Condition::parse("$status > 5").unwrap(),
            Some(Arc::new(Failing)),
            None,
            Scheduler::new(),
            false,
        );
        assert!(matches!(reminder.check().await, Err(CheckError::Watcher(_))));
    }

    #[tokio::test]
    async fn test_missing_watcher_fails_evaluation() {
        let reminder = Reminder::new(
            "r",
            Condition::parse("now > 2000-01-01").unwrap(),
            None,
            None,
            Scheduler::new(),
            false,
        );
        assert!(matches!(
            reminder.check().await,
            Err(CheckError::Evaluation(EvaluationError::StatusUnavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_activate_registers_one_job_per_schedule() {
        let scheduler = Scheduler::new();
        let reminder = Reminder::new(
            "r",
            Condition::parse("$status == up").unwrap(),
            Some(static_watcher(
                "up",
                vec![Schedule::every(Duration::from_secs(30)), Schedule::every(Duration::from_secs(90))],
            )),
            None,
            scheduler.clone(),
            false,
        );

        assert_eq!(reminder.activate().await, 2);
        assert_eq!(reminder.activate().await, 0);
        assert_eq!(scheduler.job_count().await, 2);

        reminder.deactivate().await;
        assert_eq!(reminder.job_count().await, 0);
        assert_eq!(scheduler.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_watcher_follows_reminder_lifecycle() {
        let watcher = Arc::new(Subscribed::default());
        let reminder = Reminder::new(
            "r",
            Condition::parse("$status == 1").unwrap(),
            Some(watcher.clone()),
            None,
            Scheduler::new(),
            false,
        );

        reminder.activate().await;
        assert_eq!(watcher.started.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.stopped.load(Ordering::SeqCst), 0);

        reminder.deactivate().await;
        assert_eq!(watcher.stopped.load(Ordering::SeqCst), 1);

        // Retired reminders do not come back
        assert_eq!(reminder.activate().await, 0);
        assert_eq!(watcher.started.load(Ordering::SeqCst), 1);
        assert_eq!(reminder.check().await.unwrap(), CheckOutcome::Retired);
    }

    #[tokio::test]
    async fn test_bad_schedule_leaves_others_registered() {
        let scheduler = Scheduler::new();
        let reminder = Reminder::new(
            "r",
            Condition::parse("$status == up").unwrap(),
            Some(static_watcher(
                "up",
                vec![Schedule::every(Duration::ZERO), Schedule::every(Duration::from_secs(30))],
            )),
            None,
            scheduler.clone(),
            false,
        );

        assert_eq!(reminder.activate().await, 1);
        assert_eq!(scheduler.job_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_checks_drive_alerts() {
        let (reminder, notifier) = reminder("$status > 5", "10", false);
        reminder.scheduler.start();
        reminder.activate().await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert!(reminder.alerter().unwrap().is_active().await);
    }
}
