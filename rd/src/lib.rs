//! Reminders - condition-driven alerting daemon
//!
//! A reminder binds a watcher (where the status comes from), a condition
//! (when to alert) and an alerter (how, and how often, to alert). Reminders
//! are defined one per YAML file and hot-reloaded from a directory.
//!
//! # Modules
//!
//! - [`condition`] - Sandboxed condition language
//! - [`scheduler`] - Periodic job scheduling and cancellation
//! - [`watcher`] - Status sources (`http`, `mqtt`, `file`, `static`)
//! - [`alerter`] - Repeat-until-exhausted alert lifecycle and notifiers
//! - [`reminder`] - Check logic tying the three together
//! - [`registry`] / [`store`] / [`definition`] - Loading definitions
//! - [`daemon`] - Reminder collection, reload protocol and config poller
//! - [`config`] - Daemon configuration
//! - [`cli`] - Command-line interface

pub mod alerter;
pub mod cli;
pub mod condition;
pub mod config;
pub mod daemon;
pub mod definition;
pub mod registry;
pub mod reminder;
pub mod scheduler;
pub mod store;
pub mod watcher;

pub use alerter::{Alerter, Notifier};
pub use condition::Condition;
pub use daemon::{Daemon, DaemonHandle};
pub use registry::Registry;
pub use reminder::Reminder;
pub use scheduler::Scheduler;
pub use watcher::Watcher;
