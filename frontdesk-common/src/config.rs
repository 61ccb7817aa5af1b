//! Configuration loading and resolution
//!
//! Every setting resolves through the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`FRONTDESK_*`)
//! 3. TOML config file (`frontdesk.toml`)
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default HTTP bind port
pub const DEFAULT_PORT: u16 = 5730;
/// Default resolution-poller interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Default help-request timeout in minutes
pub const DEFAULT_REQUEST_TIMEOUT_MINUTES: i64 = 60;

/// Fully-resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP bind port
    pub port: u16,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Outbound webhook for supervisor/customer notifications.
    /// When absent, notifications go to local logging.
    pub supervisor_webhook_url: Option<String>,
    /// Resolution poller tick interval (seconds)
    pub poll_interval_secs: u64,
    /// How long a pending help request waits before timing out (minutes)
    pub request_timeout_minutes: i64,
    /// Whether the knowledge resolver applies the raw full-string
    /// substring test in addition to keyword scoring
    pub raw_substring_match: bool,
}

/// Settings a caller (CLI layer) may override before resolution
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub supervisor_webhook_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_minutes: Option<i64>,
}

/// On-disk TOML schema; all fields optional
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    database_path: Option<PathBuf>,
    supervisor_webhook_url: Option<String>,
    poll_interval_secs: Option<u64>,
    request_timeout_minutes: Option<i64>,
    raw_substring_match: Option<bool>,
}

impl ServiceConfig {
    /// Resolve the full configuration from overrides, environment,
    /// config file, and defaults.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let file = load_config_file()?;

        let port = overrides
            .port
            .or_else(|| env_parse("FRONTDESK_PORT"))
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        let database_path = overrides
            .database_path
            .or_else(|| std::env::var("FRONTDESK_DB").ok().map(PathBuf::from))
            .or(file.database_path)
            .unwrap_or_else(default_database_path);

        let supervisor_webhook_url = overrides
            .supervisor_webhook_url
            .or_else(|| std::env::var("FRONTDESK_WEBHOOK_URL").ok())
            .or(file.supervisor_webhook_url)
            .filter(|url| !url.trim().is_empty());

        let poll_interval_secs = overrides
            .poll_interval_secs
            .or_else(|| env_parse("FRONTDESK_POLL_INTERVAL_SECS"))
            .or(file.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let request_timeout_minutes = overrides
            .request_timeout_minutes
            .or_else(|| env_parse("FRONTDESK_REQUEST_TIMEOUT_MINUTES"))
            .or(file.request_timeout_minutes)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MINUTES);

        if poll_interval_secs == 0 {
            return Err(Error::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if request_timeout_minutes <= 0 {
            return Err(Error::Config(
                "request_timeout_minutes must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            port,
            database_path,
            supervisor_webhook_url,
            poll_interval_secs,
            request_timeout_minutes,
            raw_substring_match: file.raw_substring_match.unwrap_or(true),
        })
    }
}

/// Parse an environment variable, ignoring unset or malformed values
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Default database location: `<config dir>/frontdesk/frontdesk.db`,
/// falling back to the working directory.
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("frontdesk").join("frontdesk.db"))
        .unwrap_or_else(|| PathBuf::from("frontdesk.db"))
}

/// Locate and parse the TOML config file, if one exists.
///
/// Looks in `<config dir>/frontdesk/frontdesk.toml`, then (on Linux)
/// `/etc/frontdesk/frontdesk.toml`. A missing file is not an error;
/// a malformed file is.
fn load_config_file() -> Result<FileConfig> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(path) = std::env::var("FRONTDESK_CONFIG") {
        candidates.push(PathBuf::from(path));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("frontdesk").join("frontdesk.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/frontdesk/frontdesk.toml"));
    }

    for path in candidates {
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let parsed: FileConfig = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            tracing::debug!("Loaded config file: {}", path.display());
            return Ok(parsed);
        }
    }

    Ok(FileConfig::default())
}

/// Ensure the parent directory of the database file exists
pub fn ensure_database_dir(database_path: &std::path::Path) -> Result<()> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
