//! Configuration types

use super::discovery::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the monitoring endpoint, e.g. `https://monitor.example.com`
    pub endpoint: String,
    /// Project identifier sent with every event
    pub project: String,
    /// Environment identifier sent with every event
    pub environment: String,
    /// Shared secret sent in the request body
    pub secret: String,
    /// Spool directory; `None` disables spooling and every event is posted inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spool_dir: Option<PathBuf>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Stamp drained records with `_seen` (time the record entered the spool)
    #[serde(default = "default_stamp_seen")]
    pub stamp_seen: bool,
    /// Directory receiving a local `.log` copy of each reported exception
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_log_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project: String::new(),
            environment: "prod".to_string(),
            secret: String::new(),
            spool_dir: None,
            timeout_secs: default_timeout_secs(),
            stamp_seen: default_stamp_seen(),
            exception_log_dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_stamp_seen() -> bool {
    true
}

impl MonitorConfig {
    /// Deployment identity attached to every delivered event
    pub fn project_context(&self) -> ProjectContext {
        ProjectContext {
            project: self.project.clone(),
            environment: self.environment.clone(),
            secret: self.secret.clone(),
        }
    }

    /// Whether events are spooled instead of posted inline
    pub fn spooling_enabled(&self) -> bool {
        self.spool_dir.is_some()
    }

    /// Check the settings needed to deliver events.
    ///
    /// Spool-only operations (status, recovery) do not need an endpoint and
    /// skip this check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Invalid("endpoint is required".to_string()));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.project.trim().is_empty() {
            return Err(ConfigError::Invalid("project is required".to_string()));
        }
        Ok(())
    }
}

/// Project, environment and shared secret, merged into the body at send time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project: String,
    pub environment: String,
    pub secret: String,
}

/// On-disk config layer. Every key is optional so layers merge key by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub stamp_seen: Option<bool>,
    #[serde(default)]
    pub exception_log_dir: Option<PathBuf>,
}
