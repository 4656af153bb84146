//! API credential configuration
//!
//! Credential resolution follows the priority order:
//! 1. Explicit override (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Empty (rejected later by `validate`)
//!
//! Missing config files never abort resolution; a credential that stays
//! empty is reported by `validate` as a configuration error so operators
//! see a deployment problem instead of silently degraded scores.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the PageSpeed Insights API key
pub const PSI_API_KEY_ENV: &str = "LMS_PSI_API_KEY";
/// Environment variable holding the Chrome UX Report API key
pub const CRUX_API_KEY_ENV: &str = "LMS_CRUX_API_KEY";

const CONFIG_DIR_NAME: &str = "lms-audit";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Credentials for the two metric APIs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// PageSpeed Insights API key
    #[serde(default)]
    pub psi_api_key: String,
    /// Chrome UX Report API key
    #[serde(default)]
    pub crux_api_key: String,
}

impl AuditConfig {
    pub fn new(psi_api_key: impl Into<String>, crux_api_key: impl Into<String>) -> Self {
        Self {
            psi_api_key: psi_api_key.into(),
            crux_api_key: crux_api_key.into(),
        }
    }

    /// Resolve credentials from environment and config file
    pub fn from_env() -> Self {
        Self::resolve(None, None)
    }

    /// Resolve credentials with optional explicit overrides
    pub fn resolve(psi_override: Option<&str>, crux_override: Option<&str>) -> Self {
        let file_config = Self::load_config_file().unwrap_or_default();

        let psi_api_key = resolve_value(psi_override, PSI_API_KEY_ENV, file_config.psi_api_key);
        let crux_api_key = resolve_value(crux_override, CRUX_API_KEY_ENV, file_config.crux_api_key);

        Self {
            psi_api_key,
            crux_api_key,
        }
    }

    /// Load credentials from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Reject empty or missing credentials
    ///
    /// The only fail-fast path of an audit: individual source failures
    /// degrade into low scores, but unusable credentials abort before any
    /// source is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.psi_api_key.trim().is_empty() {
            return Err(Error::Config(
                "PageSpeed Insights API key is not configured".to_string(),
            ));
        }
        if self.crux_api_key.trim().is_empty() {
            return Err(Error::Config(
                "CrUX API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn load_config_file() -> Option<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            return None;
        }
        match Self::from_file(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                None
            }
        }
    }
}

fn resolve_value(explicit: Option<&str>, env_var: &str, file_value: String) -> String {
    if let Some(value) = explicit {
        return value.to_string();
    }
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return value;
        }
    }
    file_value
}

/// Platform config file location: `<config_dir>/lms-audit/config.toml`,
/// with `/etc/lms-audit/config.toml` as the Linux system-wide fallback
fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let user_path = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if user_path.exists() {
            return Some(user_path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_path = PathBuf::from("/etc")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        if system_path.exists() {
            return Some(system_path);
        }
    }
    None
}
