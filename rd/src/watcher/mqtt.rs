//! MQTT subscription watcher
//!
//! Subscribes to the configured topics on a background task and caches the
//! last payload seen on any of them. `update()` only reads that cache, so a
//! check never waits on the broker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Schedule, Watcher, WatcherError};

/// Status recorded for payloads that are not valid UTF-8
pub const INVALID_PAYLOAD: &str = "ERR";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(30)
}

/// Options for the `mqtt` watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttWatcherConfig {
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub tls: bool,

    pub topics: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Generated per process when absent
    #[serde(rename = "client-id", default)]
    pub client_id: Option<String>,

    #[serde(rename = "keep-alive", with = "humantime_serde", default = "default_keep_alive")]
    pub keep_alive: Duration,
}

pub struct MqttWatcher {
    config: MqttWatcherConfig,
    schedules: Vec<Schedule>,
    status: Arc<RwLock<Option<String>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl MqttWatcher {
    pub fn new(config: MqttWatcherConfig, schedules: Vec<Schedule>) -> Self {
        debug!(hostname = %config.hostname, port = config.port, topics = ?config.topics, "MqttWatcher::new: called");
        Self {
            config,
            schedules,
            status: Arc::new(RwLock::new(None)),
            listener: Mutex::new(None),
        }
    }

    pub fn is_listening(&self) -> bool {
        let listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        listener.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn options(&self) -> MqttOptions {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                let id = Uuid::now_v7().simple().to_string();
                format!("rd-{}", &id[id.len() - 12..])
            });

        let mut options = MqttOptions::new(client_id, self.config.hostname.clone(), self.config.port);
        options.set_keep_alive(self.config.keep_alive.max(MIN_KEEP_ALIVE));
        if let Some(username) = &self.config.username {
            options.set_credentials(username.clone(), self.config.password.clone().unwrap_or_default());
        }
        if self.config.tls {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

impl Drop for MqttWatcher {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = listener.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl Watcher for MqttWatcher {
    fn kind(&self) -> &'static str {
        "mqtt"
    }

    async fn update(&self) -> Result<String, WatcherError> {
        debug!(topics = ?self.config.topics, "MqttWatcher::update: called");
        self.status.read().await.clone().ok_or_else(|| WatcherError::NoMessage {
            topics: self.config.topics.join(", "),
        })
    }

    fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    fn start(&self) {
        debug!(hostname = %self.config.hostname, "MqttWatcher::start: called");
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("MqttWatcher::start: already listening");
            return;
        }
        let broker = format!("{}:{}", self.config.hostname, self.config.port);
        *listener = Some(tokio::spawn(listen(
            broker,
            self.options(),
            self.config.topics.clone(),
            self.status.clone(),
        )));
    }

    fn stop(&self) {
        debug!(hostname = %self.config.hostname, "MqttWatcher::stop: called");
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = listener.take() {
            task.abort();
            info!(hostname = %self.config.hostname, "MQTT subscription stopped");
        }
    }
}

/// Drive the MQTT event loop, resubscribing after every (re)connect
async fn listen(broker: String, options: MqttOptions, topics: Vec<String>, status: Arc<RwLock<Option<String>>>) {
    let (client, mut eventloop) = AsyncClient::new(options, 10);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(%broker, ?topics, "Connected to MQTT broker");
                for topic in &topics {
                    if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        warn!(%broker, %topic, error = %e, "Failed to subscribe");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                record(&status, &publish.topic, &publish.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%broker, error = %e, "MQTT connection error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Replace the cached status with a received payload
async fn record(status: &RwLock<Option<String>>, topic: &str, payload: &[u8]) {
    let value = decode_payload(payload);
    debug!(%topic, %value, "MqttWatcher: message received");
    *status.write().await = Some(value);
}

/// Payload as trimmed UTF-8 text, or [`INVALID_PAYLOAD`]
fn decode_payload(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.trim().to_string(),
        Err(_) => INVALID_PAYLOAD.to_string(),
    }
}
