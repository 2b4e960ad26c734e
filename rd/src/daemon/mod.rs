//! Daemon: the reminder collection and its reload protocol
//!
//! The [`Daemon`] is a single-writer actor. File changes found by the
//! [`ConfigPoller`], rescans and shutdown all arrive as requests on one
//! channel, so a reload of a file (build new, remove old, register new)
//! never interleaves with another event for the same file.

mod core;
mod handle;
mod messages;
mod poller;

pub use core::{ApplyOutcome, Daemon, LoadSummary};
pub use handle::DaemonHandle;
pub use messages::{ConfigEvent, DaemonRequest, ReminderStatus};
pub use poller::ConfigPoller;
