//! Alert delivery and the repeat-until-exhausted lifecycle

mod core;
mod error;
mod http;
mod log;

use async_trait::async_trait;

pub use core::{AlertOutcome, Alerter, AlerterConfig, AlerterSnapshot};
pub use error::DeliveryError;
pub use http::{HttpNotifier, HttpNotifierConfig};
pub use log::LogNotifier;

/// Delivery channel for a single alert
///
/// Notifiers only transmit. Repeat counting and deactivation live in
/// [`Alerter`] so every channel gets the same bookkeeping.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Discriminator this notifier was built from
    fn kind(&self) -> &'static str;

    /// Deliver one alert; `repeat` is 0 for the first alert of an activation
    async fn deliver(&self, reminder: &str, message: &str, repeat: u32) -> Result<(), DeliveryError>;
}
