//! Notifier that POSTs alerts as JSON

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{DeliveryError, Notifier};

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Options for the `http` alerter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpNotifierConfig {
    pub url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

pub struct HttpNotifier {
    config: HttpNotifierConfig,
    http: Client,
}

impl HttpNotifier {
    pub fn new(config: HttpNotifierConfig) -> Result<Self, DeliveryError> {
        debug!(url = %config.url, "HttpNotifier::new: called");
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| DeliveryError::Http {
                url: config.url.clone(),
                source,
            })?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, reminder: &str, message: &str, repeat: u32) -> Result<(), DeliveryError> {
        debug!(url = %self.config.url, %reminder, repeat, "HttpNotifier::deliver: called");
        let body = json!({
            "reminder": reminder,
            "message": message,
            "repeat": repeat,
        });

        let mut request = self.http.post(&self.config.url).json(&body);
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|source| DeliveryError::Http {
            url: self.config.url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: self.config.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
