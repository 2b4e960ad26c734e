use thiserror::Error;

/// Status retrieval failed
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} is not valid JSON: {message}")]
    Json { url: String, message: String },

    #[error("JSON path '{path}' not found in response")]
    PathNotFound { path: String },

    #[error("Value at '{path}' is {kind}, expected a scalar")]
    Unsupported { path: String, kind: &'static str },

    #[error("No message received yet on {topics}")]
    NoMessage { topics: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
