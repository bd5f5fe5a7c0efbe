//! Routing of reported events
//!
//! With a spool directory configured every event is enqueued and the caller
//! never waits on the monitoring endpoint; without one every event is posted
//! inline. The spool is only emptied by [`Transmitter::drain_spool`], which an
//! external trigger invokes.

use crate::config::MonitorConfig;
use crate::delivery::{Delivery, HttpTransport, Transport};
use crate::error::MonitorError;
use crate::event::{DeliveryEvent, DeprecationDetail, ExceptionDetail};
use crate::io::spool::{DrainReport, EnqueueOutcome, Spool, SpoolOptions};
use std::time::Duration;
use tracing::debug;

/// What happened to a reported event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Posted inline and accepted
    Sent,
    /// Written to (or already present in) the spool
    Spooled(EnqueueOutcome),
}

/// Entry point for hosts reporting exceptions and deprecations
#[derive(Debug)]
pub struct Transmitter<T = HttpTransport> {
    delivery: Delivery<T>,
    spool: Option<Spool>,
}

impl Transmitter<HttpTransport> {
    /// Build a transmitter posting over HTTP with the configured timeout.
    ///
    /// # Errors
    ///
    /// `MonitorError::Configuration` if the config is invalid, the HTTP client
    /// cannot be built, or `spool_dir` is set but does not exist.
    pub fn new(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))
            .map_err(|e| MonitorError::Configuration(e.to_string()))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Transmitter<T> {
    /// Build a transmitter over a caller-supplied transport.
    pub fn with_transport(config: &MonitorConfig, transport: T) -> Result<Self, MonitorError> {
        config.validate()?;

        let spool = match &config.spool_dir {
            Some(dir) => {
                let options = SpoolOptions {
                    stamp_seen: config.stamp_seen,
                };
                Some(Spool::open(dir, options).map_err(|e| MonitorError::Configuration(e.to_string()))?)
            }
            None => None,
        };

        Ok(Self {
            delivery: Delivery::new(&config.endpoint, config.project_context(), transport),
            spool,
        })
    }

    /// The spool, when spooling is enabled
    pub fn spool(&self) -> Option<&Spool> {
        self.spool.as_ref()
    }

    pub fn delivery(&self) -> &Delivery<T> {
        &self.delivery
    }

    /// Report an exception.
    ///
    /// Spool errors and inline delivery errors are returned to the caller;
    /// whether to ignore them is the host's policy.
    pub fn report_exception(&self, detail: &ExceptionDetail) -> Result<Dispatch, MonitorError> {
        self.dispatch(DeliveryEvent::exception(detail))
    }

    /// Report a deprecation notice.
    pub fn report_deprecation(&self, detail: &DeprecationDetail) -> Result<Dispatch, MonitorError> {
        self.dispatch(DeliveryEvent::deprecation(detail))
    }

    /// Short form of [`report_exception`](Self::report_exception).
    pub fn exception(
        &self,
        message: &str,
        contents: &str,
        caught: bool,
    ) -> Result<Dispatch, MonitorError> {
        self.report_exception(&ExceptionDetail::new(message, contents, caught))
    }

    /// Short form of [`report_deprecation`](Self::report_deprecation).
    pub fn deprecation(
        &self,
        file: &str,
        line: u32,
        message: &str,
        contents: &str,
    ) -> Result<Dispatch, MonitorError> {
        self.report_deprecation(&DeprecationDetail::new(file, line, message, contents))
    }

    /// Post an event inline even when spooling is enabled.
    pub fn send_now(&self, event: &DeliveryEvent) -> Result<(), MonitorError> {
        self.delivery.send(event.kind, event.fields.clone())?;
        Ok(())
    }

    /// Deliver everything pending in the spool.
    ///
    /// Returns an empty report when spooling is disabled. Stops at the first
    /// failed delivery; see [`Spool::drain`].
    pub fn drain_spool(&self) -> Result<DrainReport, MonitorError> {
        let Some(spool) = &self.spool else {
            debug!("spooling disabled, nothing to drain");
            return Ok(DrainReport::default());
        };

        let report = spool.drain(|kind, fields| self.delivery.send(kind, fields))?;
        Ok(report)
    }

    fn dispatch(&self, event: DeliveryEvent) -> Result<Dispatch, MonitorError> {
        match &self.spool {
            Some(spool) => Ok(Dispatch::Spooled(spool.enqueue(&event)?)),
            None => {
                self.delivery.send(event.kind, event.fields)?;
                Ok(Dispatch::Sent)
            }
        }
    }
}
