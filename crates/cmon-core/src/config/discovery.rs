//! Configuration discovery and resolution

use super::types::{ConfigFile, MonitorConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration is present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub project: Option<String>,
    pub environment: Option<String>,
    pub secret: Option<String>,
    pub spool_dir: Option<PathBuf>,
    /// Explicit config file; replaces the repo-local lookup and must parse
    pub config_path: Option<PathBuf>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables (`CMON_ENDPOINT`, `CMON_PROJECT`,
///    `CMON_ENVIRONMENT`, `CMON_SECRET`, `CMON_SPOOL_DIR`)
/// 3. Explicit `--config` file, or repo-local `.cmon.toml` (current dir up to git root)
/// 4. Global config (`<home>/.config/cmon/config.toml`)
/// 5. Defaults
///
/// Discovered files that fail to parse are skipped with a warning; an
/// explicit config file that fails to load is an error.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<MonitorConfig, ConfigError> {
    let mut config = MonitorConfig::default();

    // 4. Global config
    let global_config_path = home_dir.join(".config/cmon/config.toml");
    if global_config_path.exists() {
        match load_config_file(&global_config_path) {
            Ok(file) => merge_config(&mut config, file),
            Err(e) => warn!("Skipping global config: {e}"),
        }
    }

    // 3. Explicit or repo-local config
    if let Some(ref explicit) = overrides.config_path {
        merge_config(&mut config, load_config_file(explicit)?);
    } else if let Some(repo_config) = find_repo_local_config(current_dir) {
        match load_config_file(&repo_config) {
            Ok(file) => merge_config(&mut config, file),
            Err(e) => warn!("Skipping repo config: {e}"),
        }
    }

    // 2. Environment variables
    apply_env_overrides(&mut config);

    // 1. Command-line overrides
    apply_cli_overrides(&mut config, overrides);

    Ok(config)
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(".cmon.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Merge a file layer into the base config, key by key
fn merge_config(base: &mut MonitorConfig, file: ConfigFile) {
    if let Some(endpoint) = file.endpoint {
        base.endpoint = endpoint;
    }
    if let Some(project) = file.project {
        base.project = project;
    }
    if let Some(environment) = file.environment {
        base.environment = environment;
    }
    if let Some(secret) = file.secret {
        base.secret = secret;
    }
    if file.spool_dir.is_some() {
        base.spool_dir = file.spool_dir;
    }
    if let Some(timeout_secs) = file.timeout_secs {
        base.timeout_secs = timeout_secs;
    }
    if let Some(stamp_seen) = file.stamp_seen {
        base.stamp_seen = stamp_seen;
    }
    if file.exception_log_dir.is_some() {
        base.exception_log_dir = file.exception_log_dir;
    }
}

/// Read an env var, treating blank values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn apply_env_overrides(config: &mut MonitorConfig) {
    if let Some(endpoint) = env_value("CMON_ENDPOINT") {
        config.endpoint = endpoint;
    }
    if let Some(project) = env_value("CMON_PROJECT") {
        config.project = project;
    }
    if let Some(environment) = env_value("CMON_ENVIRONMENT") {
        config.environment = environment;
    }
    if let Some(secret) = env_value("CMON_SECRET") {
        config.secret = secret;
    }
    if let Some(spool_dir) = env_value("CMON_SPOOL_DIR") {
        config.spool_dir = Some(PathBuf::from(spool_dir));
    }
}

fn apply_cli_overrides(config: &mut MonitorConfig, overrides: &ConfigOverrides) {
    if let Some(ref endpoint) = overrides.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ref project) = overrides.project {
        config.project = project.clone();
    }
    if let Some(ref environment) = overrides.environment {
        config.environment = environment.clone();
    }
    if let Some(ref secret) = overrides.secret {
        config.secret = secret.clone();
    }
    if let Some(ref spool_dir) = overrides.spool_dir {
        config.spool_dir = Some(spool_dir.clone());
    }
}
