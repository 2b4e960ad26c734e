use thiserror::Error;

/// Alert transmission failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to reach {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} rejected alert with HTTP {status}")]
    Status { url: String, status: u16 },
}
