//! Configuration file handling for ~/.config/tilewarm/config.ini.
//!
//! Every key is optional. Values use the same syntax as the matching
//! command-line flag and are validated on load.
//!
//! ```ini
//! [request]
//! method = HEAD
//! concurrency = 4,15-18=16
//! max_retries = 5
//! retry_base_timeout_ms = 500
//! backoff = linear
//! timeout_secs = 30
//! progress_interval = 50
//!
//! [region]
//! zoom = 7-16
//! buffer = 10km
//!
//! [headers]
//! Authorization = Bearer secret
//! ```

use std::path::{Path, PathBuf};

use ini::{Ini, Properties};
use thiserror::Error;

use super::parser::{parse_backoff, parse_buffer, parse_zoom_levels, parse_zoom_schedule};
use super::ZoomParam;
use crate::retry::Backoff;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings read from the configuration file.
///
/// `None` means "not set"; the CLI then falls back to its own default.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub method: Option<String>,
    pub concurrency: Option<ZoomParam<usize>>,
    pub max_retries: Option<ZoomParam<u32>>,
    pub retry_base_timeout_ms: Option<ZoomParam<u64>>,
    pub backoff: Option<Backoff>,
    pub timeout_secs: Option<u64>,
    pub progress_interval: Option<u64>,
    pub zoom: Option<Vec<u8>>,
    /// Kept as text so the region parser reports errors the same way for
    /// both sources.
    pub buffer: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ConfigFile {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Parse an already loaded `Ini` document.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        // [request] section
        if let Some(section) = ini.section(Some("request")) {
            config.method = non_empty(section, "method").map(str::to_uppercase);

            if let Some(v) = non_empty(section, "concurrency") {
                config.concurrency = Some(
                    parse_zoom_schedule("concurrency", v)
                        .map_err(|e| invalid("request", "concurrency", v, e))?,
                );
            }
            if let Some(v) = non_empty(section, "max_retries") {
                config.max_retries = Some(
                    parse_zoom_schedule("max_retries", v)
                        .map_err(|e| invalid("request", "max_retries", v, e))?,
                );
            }
            if let Some(v) = non_empty(section, "retry_base_timeout_ms") {
                config.retry_base_timeout_ms = Some(
                    parse_zoom_schedule("retry_base_timeout_ms", v)
                        .map_err(|e| invalid("request", "retry_base_timeout_ms", v, e))?,
                );
            }
            if let Some(v) = non_empty(section, "backoff") {
                config.backoff =
                    Some(parse_backoff(v).map_err(|e| invalid("request", "backoff", v, e))?);
            }
            if let Some(v) = non_empty(section, "timeout_secs") {
                config.timeout_secs = Some(
                    v.parse()
                        .map_err(|e| invalid("request", "timeout_secs", v, e))?,
                );
            }
            if let Some(v) = non_empty(section, "progress_interval") {
                let interval: u64 = v
                    .parse()
                    .map_err(|e| invalid("request", "progress_interval", v, e))?;
                if interval == 0 {
                    return Err(invalid("request", "progress_interval", v, "must be at least 1"));
                }
                config.progress_interval = Some(interval);
            }
        }

        // [region] section
        if let Some(section) = ini.section(Some("region")) {
            if let Some(v) = non_empty(section, "zoom") {
                config.zoom =
                    Some(parse_zoom_levels(v).map_err(|e| invalid("region", "zoom", v, e))?);
            }
            if let Some(v) = non_empty(section, "buffer") {
                parse_buffer(v).map_err(|e| invalid("region", "buffer", v, e))?;
                config.buffer = Some(v.to_string());
            }
        }

        // [headers] section: every key is a header name
        if let Some(section) = ini.section(Some("headers")) {
            config.headers = section
                .iter()
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .collect();
        }

        Ok(config)
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: impl ToString) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Get the path to the config directory (~/.config/tilewarm on Linux).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilewarm")
}

/// Get the path to the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
