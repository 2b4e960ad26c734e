//! Scheduler implementation

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::job::{JobCallback, JobId, JobSchedulingError};

/// A registered job and the task driving its ticks
struct JobEntry {
    name: String,
    interval: Duration,
    ticker: JoinHandle<()>,
}

/// Internal state protected by mutex
struct SchedulerInner {
    jobs: HashMap<JobId, JobEntry>,
    shut_down: bool,
    stats: SchedulerStats,
}

struct Shared {
    inner: Mutex<SchedulerInner>,
    running: watch::Sender<bool>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        for (_, entry) in self.inner.get_mut().jobs.drain() {
            entry.ticker.abort();
        }
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_scheduled: u64,
    pub total_cancelled: u64,
    pub total_rejected: u64,
}

/// Periodic job scheduler
///
/// Cheap to clone; all clones drive the same set of jobs. Callbacks run on
/// their own tokio task, so cancelling a job never interrupts a callback that
/// is already executing. A tick that arrives while the previous callback of
/// the same job is still running is skipped.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

/// Non-owning handle to a [`Scheduler`], for callbacks that must not keep it alive
#[derive(Clone)]
pub struct WeakScheduler {
    shared: Weak<Shared>,
}

impl WeakScheduler {
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.shared.upgrade().map(|shared| Scheduler { shared })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a stopped scheduler
    pub fn new() -> Self {
        debug!("Scheduler::new: called");
        let (running, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(SchedulerInner {
                    jobs: HashMap::new(),
                    shut_down: false,
                    stats: SchedulerStats::default(),
                }),
                running,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Let registered jobs start ticking
    pub fn start(&self) {
        debug!("Scheduler::start: called");
        self.shared.running.send_replace(true);
        info!("Scheduler started");
    }

    /// Whether `start` has been called
    pub fn is_running(&self) -> bool {
        *self.shared.running.borrow()
    }

    /// Register a periodic callback
    ///
    /// Returns immediately; the first firing happens one `interval` after the
    /// scheduler is started (or after registration, if already started).
    pub async fn schedule(
        &self,
        name: &str,
        interval: Duration,
        callback: JobCallback,
    ) -> Result<JobId, JobSchedulingError> {
        debug!(%name, ?interval, "Scheduler::schedule: called");
        let mut inner = self.shared.inner.lock().await;

        if inner.shut_down {
            debug!(%name, "Scheduler::schedule: shut down, rejecting");
            inner.stats.total_rejected += 1;
            return Err(JobSchedulingError::ShutDown { name: name.to_string() });
        }

        if interval.is_zero() {
            debug!(%name, "Scheduler::schedule: zero interval, rejecting");
            inner.stats.total_rejected += 1;
            return Err(JobSchedulingError::InvalidInterval {
                name: name.to_string(),
                interval,
            });
        }

        let id = JobId::new();
        let ticker = tokio::spawn(run_ticker(
            id,
            name.to_string(),
            interval,
            callback,
            self.shared.running.subscribe(),
        ));

        inner.jobs.insert(
            id,
            JobEntry {
                name: name.to_string(),
                interval,
                ticker,
            },
        );
        inner.stats.total_scheduled += 1;

        debug!(%name, job = %id, ?interval, "Scheduled job");
        Ok(id)
    }

    /// Stop future firings of a job
    ///
    /// Unknown or already-cancelled ids are ignored. Returns whether a job was removed.
    pub async fn cancel(&self, id: &JobId) -> bool {
        debug!(job = %id, "Scheduler::cancel: called");
        let mut inner = self.shared.inner.lock().await;

        match inner.jobs.remove(id) {
            Some(entry) => {
                entry.ticker.abort();
                inner.stats.total_cancelled += 1;
                debug!(job = %id, name = %entry.name, "Cancelled job");
                true
            }
            None => {
                debug!(job = %id, "Scheduler::cancel: unknown job, ignoring");
                false
            }
        }
    }

    /// Whether a job is currently registered
    pub async fn contains(&self, id: &JobId) -> bool {
        self.shared.inner.lock().await.jobs.contains_key(id)
    }

    /// Number of registered jobs
    pub async fn job_count(&self) -> usize {
        self.shared.inner.lock().await.jobs.len()
    }

    /// Names and intervals of registered jobs
    pub async fn jobs(&self) -> Vec<(JobId, String, Duration)> {
        let inner = self.shared.inner.lock().await;
        let mut jobs: Vec<_> = inner
            .jobs
            .iter()
            .map(|(id, entry)| (*id, entry.name.clone(), entry.interval))
            .collect();
        jobs.sort_by(|a, b| a.1.cmp(&b.1));
        jobs
    }

    /// Get the scheduler statistics
    pub async fn stats(&self) -> SchedulerStats {
        self.shared.inner.lock().await.stats.clone()
    }

    /// Cancel every job and refuse new registrations
    pub async fn shutdown(&self) {
        debug!("Scheduler::shutdown: called");
        let mut inner = self.shared.inner.lock().await;
        inner.shut_down = true;

        let count = inner.jobs.len();
        for (_, entry) in inner.jobs.drain() {
            entry.ticker.abort();
        }
        inner.stats.total_cancelled += count as u64;
        self.shared.running.send_replace(false);

        info!(cancelled = count, "Scheduler shut down");
    }
}

async fn run_ticker(
    id: JobId,
    name: String,
    interval: Duration,
    callback: JobCallback,
    mut running: watch::Receiver<bool>,
) {
    if running.wait_for(|started| *started).await.is_err() {
        debug!(job = %id, %name, "run_ticker: scheduler dropped before start");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        ticker.tick().await;

        if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!(job = %id, %name, "Previous run still in progress, skipping tick");
            continue;
        }

        debug!(job = %id, %name, "run_ticker: firing");
        in_flight = Some(tokio::spawn(callback()));
    }
}
