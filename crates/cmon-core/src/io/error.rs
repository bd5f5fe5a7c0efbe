//! Error types for spool operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the spool
#[derive(Error, Debug)]
pub enum SpoolError {
    /// Spool directory is configured but does not exist
    #[error("Spool directory \"{path}\" does not exist")]
    MissingDirectory { path: PathBuf },

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to encode or decode a spooled payload
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A claimed record did not decode to a JSON object
    #[error("Spool record {path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },

    /// Failed to acquire the drain lock after the allowed retries
    #[error("Failed to acquire lock on {path} after {retries} retries")]
    LockTimeout { path: PathBuf, retries: u32 },
}

impl SpoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpoolError::Io {
            path: path.into(),
            source,
        }
    }
}
