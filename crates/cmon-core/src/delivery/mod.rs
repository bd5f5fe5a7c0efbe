//! Delivery of events to the monitoring endpoint
//!
//! Shared by inline sends and spool drains: both go through
//! [`Delivery::send`], which posts to `<endpoint>/monitoring/<kind>` with the
//! event fields plus the deployment's project, environment and secret.

mod error;
mod transport;

pub use error::DeliveryError;
pub use transport::{HttpTransport, Transport, CONTENT_TYPE_LD_JSON};

use crate::config::ProjectContext;
use crate::event::{EventFields, EventKind};
use crate::payload::with_project_context;
use serde_json::Value;
use tracing::info;

/// Endpoint, deployment identity and transport bundled for sending
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    base_url: String,
    context: ProjectContext,
    transport: T,
}

impl<T: Transport> Delivery<T> {
    /// `endpoint` is the base URL; a trailing `/` is ignored.
    pub fn new(endpoint: &str, context: ProjectContext, transport: T) -> Self {
        Self {
            base_url: format!("{}/monitoring", endpoint.trim().trim_end_matches('/')),
            context,
            transport,
        }
    }

    /// Target URL for a kind
    pub fn url(&self, kind: EventKind) -> String {
        format!("{}/{kind}", self.base_url)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST one event. Failures are returned as-is, never retried.
    pub fn send(&self, kind: EventKind, fields: EventFields) -> Result<(), DeliveryError> {
        let url = self.url(kind);
        let body = Value::Object(with_project_context(fields, &self.context));
        self.transport.post_json(&url, &body)?;
        info!(kind = %kind, url = %url, "event delivered");
        Ok(())
    }
}
