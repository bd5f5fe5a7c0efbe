//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Command-line flags (passed as parameters)
//! 2. Environment variables
//! 3. Repo-local config (.cmon.toml)
//! 4. Global config (~/.config/cmon/config.toml)
//! 5. Defaults
//!
//! The resolved [`MonitorConfig`] is read once when the engine is built and
//! never re-read at runtime.

mod discovery;
mod types;

pub use discovery::{resolve_config, ConfigError, ConfigOverrides};
pub use types::{ConfigFile, MonitorConfig, ProjectContext};
