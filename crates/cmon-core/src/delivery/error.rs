//! Delivery error types

use thiserror::Error;

/// A failed POST to the monitoring endpoint.
///
/// Never retried at this layer: an inline send returns it to the caller and a
/// drain aborts its pass on it.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered with a non-2xx status
    #[error("POST {url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The request never completed (connect, TLS, timeout, ...)
    #[error("POST {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The payload could not be encoded
    #[error("Failed to encode payload for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
