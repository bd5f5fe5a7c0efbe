//! HTTP transport seam
//!
//! The engine only needs "POST this JSON, tell me if it was accepted". Timeout
//! and connection policy live in the transport, so hosts and tests can swap it.

use super::error::DeliveryError;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Media type the monitoring endpoint expects
pub const CONTENT_TYPE_LD_JSON: &str = "application/ld+json";

/// Longest response body kept in a [`DeliveryError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Posts JSON bodies to the monitoring endpoint
pub trait Transport {
    /// POST `body` to `url`; any non-2xx answer is an error.
    fn post_json(&self, url: &str, body: &Value) -> Result<(), DeliveryError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), DeliveryError> {
        (**self).post_json(url, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), DeliveryError> {
        (**self).post_json(url, body)
    }
}

/// Blocking `reqwest` transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("code-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(body).map_err(|e| DeliveryError::Encode {
            url: url.to_string(),
            source: e,
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_LD_JSON))
            .body(payload)
            .send()
            .map_err(|e| DeliveryError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(url, status = status.as_u16(), "event accepted");
            return Ok(());
        }

        let mut body = response.text().unwrap_or_else(|_| "unknown".to_string());
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(DeliveryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
