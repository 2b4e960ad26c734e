//! Notifier that writes alerts to the log

use async_trait::async_trait;
use tracing::warn;

use super::{DeliveryError, Notifier};

/// Emits each alert as a `WARN` record
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn kind(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, reminder: &str, message: &str, repeat: u32) -> Result<(), DeliveryError> {
        warn!(%reminder, repeat, "{}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_delivery_never_fails() {
        let notifier = LogNotifier::new();
        assert!(notifier.deliver("disk.yaml", "disk almost full", 0).await.is_ok());
        assert_eq!(notifier.kind(), "log");
    }
}
