//! Crate-level error type

use crate::config::ConfigError;
use crate::delivery::DeliveryError;
use crate::io::error::SpoolError;
use crate::io::spool::DrainError;
use thiserror::Error;

/// Errors surfaced by the [`Transmitter`](crate::Transmitter)
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The engine cannot start with the given configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Inline POST failed
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Writing to the spool failed
    #[error(transparent)]
    Spool(#[from] SpoolError),

    /// A drain pass stopped early
    #[error(transparent)]
    Drain(#[from] DrainError),
}

impl From<ConfigError> for MonitorError {
    fn from(e: ConfigError) -> Self {
        MonitorError::Configuration(e.to_string())
    }
}
