//! Configuration file loading.
//!
//! Values come from a RON file, then command-line flags override them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jobdesk_core::ReporterTimings;
use jobdesk_engine::{ClientSettings, DriverSettings, EndpointPaths, DEFAULT_MAX_ITEMS};
use jobdesk_logging::desk_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::CliArgs;

const DEFAULT_CONFIG_FILENAME: &str = "jobdesk.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub csrf_token: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_items: u32,
    pub paths: EndpointPaths,
    pub timings: TimingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            csrf_token: client.csrf_token,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            max_items: DEFAULT_MAX_ITEMS,
            paths: client.paths,
            timings: TimingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub fetch_hide_delay_ms: u64,
    pub bulk_hide_delay_ms: u64,
    pub forced_completion_secs: u64,
    pub max_stream_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let driver = DriverSettings::default();
        let timings = driver.timings;
        Self {
            tick_interval_ms: millis(timings.tick_interval),
            fetch_hide_delay_ms: millis(timings.fetch_hide_delay),
            bulk_hide_delay_ms: millis(timings.bulk_hide_delay),
            forced_completion_secs: timings.forced_completion_after.as_secs(),
            max_stream_attempts: timings.max_stream_attempts,
            reconnect_delay_ms: millis(driver.reconnect_delay),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    /// Loads the explicit file, or `./jobdesk.ron` if it exists, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        desk_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(token) = &args.csrf_token {
            self.csrf_token = token.clone();
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            csrf_token: self.csrf_token.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            paths: self.paths.clone(),
        }
    }

    pub fn driver_settings(&self) -> DriverSettings {
        let t = &self.timings;
        DriverSettings {
            timings: ReporterTimings {
                tick_interval: Duration::from_millis(t.tick_interval_ms.max(1)),
                fetch_hide_delay: Duration::from_millis(t.fetch_hide_delay_ms),
                bulk_hide_delay: Duration::from_millis(t.bulk_hide_delay_ms),
                forced_completion_after: Duration::from_secs(t.forced_completion_secs),
                max_stream_attempts: t.max_stream_attempts.max(1),
            },
            reconnect_delay: Duration::from_millis(t.reconnect_delay_ms),
        }
    }
}
