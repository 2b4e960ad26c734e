//! Scheduler adapter for periodic jobs
//!
//! Wraps tokio timers behind two operations: `schedule` registers a periodic
//! callback and returns a [`JobId`], `cancel` stops future firings of a job.
//! Jobs registered before [`Scheduler::start`] wait for the start signal.

mod core;
mod job;

pub use core::{Scheduler, SchedulerStats, WeakScheduler};
pub use job::{JobCallback, JobId, JobSchedulingError, job};
