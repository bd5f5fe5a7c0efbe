//! Home directory resolution
//!
//! The global config file lives at `<home>/.config/cmon/config.toml`. Tests and
//! containerised deployments point `CMON_HOME` at a scratch directory instead of
//! relying on the platform home.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the home directory used for config discovery.
///
/// `CMON_HOME` wins when set to a non-blank value (surrounding whitespace is
/// trimmed); otherwise the platform home from `dirs::home_dir()` is used.
///
/// # Errors
///
/// Fails only when `CMON_HOME` is unset and the platform home cannot be
/// determined.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("CMON_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    dirs::home_dir().context("Could not determine home directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn with_cmon_home<F: FnOnce()>(value: Option<&str>, f: F) {
        let original = env::var("CMON_HOME").ok();
        unsafe {
            match value {
                Some(v) => env::set_var("CMON_HOME", v),
                None => env::remove_var("CMON_HOME"),
            }
        }

        f();

        unsafe {
            match original {
                Some(v) => env::set_var("CMON_HOME", v),
                None => env::remove_var("CMON_HOME"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_cmon_home_set() {
        with_cmon_home(Some("/srv/monitor"), || {
            assert_eq!(get_home_dir().unwrap(), PathBuf::from("/srv/monitor"));
        });
    }

    #[test]
    #[serial]
    fn test_cmon_home_trimmed() {
        with_cmon_home(Some("  /srv/monitor  "), || {
            assert_eq!(get_home_dir().unwrap(), PathBuf::from("/srv/monitor"));
        });
    }

    #[test]
    #[serial]
    fn test_blank_cmon_home_uses_platform_default() {
        with_cmon_home(Some("   "), || {
            assert_eq!(get_home_dir().unwrap(), dirs::home_dir().unwrap());
        });
    }

    #[test]
    #[serial]
    fn test_unset_cmon_home_uses_platform_default() {
        with_cmon_home(None, || {
            assert_eq!(get_home_dir().unwrap(), dirs::home_dir().unwrap());
        });
    }
}
