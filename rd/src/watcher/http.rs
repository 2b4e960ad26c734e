//! HTTP polling watcher

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Schedule, Watcher, WatcherError};

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Options for the `http` watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpWatcherConfig {
    pub url: String,

    /// Path into a JSON body (`data.items[0].count`); the raw body is used when absent
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

/// Polls a URL with GET and extracts the status from the response
pub struct HttpWatcher {
    config: HttpWatcherConfig,
    schedules: Vec<Schedule>,
    http: Client,
}

impl HttpWatcher {
    pub fn new(config: HttpWatcherConfig, schedules: Vec<Schedule>) -> Result<Self, WatcherError> {
        debug!(url = %config.url, timeout = ?config.timeout, "HttpWatcher::new: called");
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| WatcherError::Http {
                url: config.url.clone(),
                source,
            })?;

        Ok(Self {
            config,
            schedules,
            http,
        })
    }

    fn http_error(&self, source: reqwest::Error) -> WatcherError {
        WatcherError::Http {
            url: self.config.url.clone(),
            source,
        }
    }
}

#[async_trait]
impl Watcher for HttpWatcher {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn update(&self) -> Result<String, WatcherError> {
        debug!(url = %self.config.url, "HttpWatcher::update: called");
        let mut request = self.http.get(&self.config.url);
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| self.http_error(e))?;
        let status = response.status();
        if !status.is_success() {
            debug!(url = %self.config.url, %status, "HttpWatcher::update: non-success status");
            return Err(WatcherError::Status {
                url: self.config.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.http_error(e))?;

        let Some(path) = &self.config.json_path else {
            return Ok(body.trim().to_string());
        };

        let json: Value = serde_json::from_str(&body).map_err(|e| WatcherError::Json {
            url: self.config.url.clone(),
            message: e.to_string(),
        })?;
        extract(&json, path)
    }

    fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }
}

/// Walk a path through objects (by key) and arrays (by index)
///
/// Covers the field and index subset of JMESPath: `data.items[0].count`,
/// `data.items[-1]` and the bare-index form `data.items.0` all resolve.
pub(crate) fn extract(json: &Value, path: &str) -> Result<String, WatcherError> {
    let not_found = || WatcherError::PathNotFound { path: path.to_string() };

    let mut current = json;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (key, mut indices) = match segment.find('[') {
            Some(at) => segment.split_at(at),
            None => (segment, ""),
        };

        if !key.is_empty() {
            current = match current {
                Value::Object(map) => map.get(key).ok_or_else(not_found)?,
                Value::Array(items) => {
                    let index: usize = key.parse().map_err(|_| not_found())?;
                    items.get(index).ok_or_else(not_found)?
                }
                _ => return Err(not_found()),
            };
        }

        while !indices.is_empty() {
            let rest = indices.strip_prefix('[').ok_or_else(not_found)?;
            let close = rest.find(']').ok_or_else(not_found)?;
            let index: i64 = rest[..close].trim().parse().map_err(|_| not_found())?;
            indices = &rest[close + 1..];

            let Value::Array(items) = current else {
                return Err(not_found());
            };
            let position = if index < 0 {
                items.len().checked_sub(index.unsigned_abs() as usize)
            } else {
                Some(index as usize)
            };
            current = position.and_then(|i| items.get(i)).ok_or_else(not_found)?;
        }
    }

    match current {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(WatcherError::Unsupported {
            path: path.to_string(),
            kind: "null",
        }),
        Value::Array(_) => Err(WatcherError::Unsupported {
            path: path.to_string(),
            kind: "an array",
        }),
        Value::Object(_) => Err(WatcherError::Unsupported {
            path: path.to_string(),
            kind: "an object",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::default_schedules;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn watcher(url: String, json_path: Option<&str>) -> HttpWatcher {
        let config = HttpWatcherConfig {
            url,
            json_path: json_path.map(String::from),
            headers: BTreeMap::from([("X-Token".to_string(), "secret".to_string())]),
            timeout: Duration::from_secs(5),
        };
        HttpWatcher::new(config, default_schedules()).unwrap()
    }

    #[test]
    fn test_extract_paths() {
        let body = json!({"data": {"count": 7, "items": [{"state": "open"}], "ok": true, "none": null}});
        assert_eq!(extract(&body, "data.count").unwrap(), "7");
        assert_eq!(extract(&body, "data.items.0.state").unwrap(), "open");
        assert_eq!(extract(&body, "data.ok").unwrap(), "true");
        assert_eq!(extract(&body, "data.items[0].state").unwrap(), "open");
        assert_eq!(extract(&body, "data.items[-1].state").unwrap(), "open");
        assert!(matches!(
            extract(&body, "data.items[-2]"),
            Err(WatcherError::PathNotFound { .. })
        ));
        assert!(matches!(
            extract(&body, "data.count[0]"),
            Err(WatcherError::PathNotFound { .. })
        ));
        assert!(matches!(
            extract(&body, "data.missing"),
            Err(WatcherError::PathNotFound { .. })
        ));
        assert!(matches!(
            extract(&body, "data.items.3"),
            Err(WatcherError::PathNotFound { .. })
        ));
        assert!(matches!(
            extract(&body, "data.none"),
            Err(WatcherError::Unsupported { kind: "null", .. })
        ));
        assert!(matches!(
            extract(&body, "data"),
            Err(WatcherError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: HttpWatcherConfig = serde_yaml::from_str("url: http://localhost/status").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.json_path.is_none());
        assert!(config.headers.is_empty());
    }

    #[tokio::test]
    async fn test_json_path_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(header("X-Token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"count": 12}})))
            .mount(&server)
            .await;

        let watcher = watcher(format!("{}/status", server.uri()), Some("data.count"));
        assert_eq!(watcher.update().await.unwrap(), "12");
    }

    #[tokio::test]
    async fn test_raw_body_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("open\n"))
            .mount(&server)
            .await;

        let watcher = watcher(format!("{}/status", server.uri()), None);
        assert_eq!(watcher.update().await.unwrap(), "open");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let watcher = watcher(format!("{}/status", server.uri()), None);
        assert!(matches!(
            watcher.update().await,
            Err(WatcherError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let watcher = watcher(format!("{}/status", server.uri()), Some("data"));
        assert!(matches!(watcher.update().await, Err(WatcherError::Json { .. })));
    }
}
