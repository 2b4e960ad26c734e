//! Job identifiers and callbacks

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use uuid::Uuid;

/// Callback invoked on every tick of a job
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`JobCallback`]
pub fn job<F, Fut>(f: F) -> JobCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Opaque handle for a registered job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The scheduler refused a registration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobSchedulingError {
    #[error("Job '{name}' has an invalid interval {interval:?}")]
    InvalidInterval { name: String, interval: Duration },

    #[error("Scheduler is shut down, cannot register job '{name}'")]
    ShutDown { name: String },
}
