//! Configuration file handling with TOML support.

use crate::limiter::DEFAULT_MIN_SPACING;
use crate::models::ViewMode;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Request pacing
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Alert notifications
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, without the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Bearer token of the signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// User id; looked up from the token when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            token: None,
            user_id: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_timeout() -> u64 {
    10
}

/// Request pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Minimum gap between request starts, in milliseconds
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl LimiterConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

fn default_min_spacing_ms() -> u64 {
    DEFAULT_MIN_SPACING.as_millis() as u64
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds between alert refreshes in watch mode
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound of the "near" bucket, in percent
    #[serde(default = "default_near_threshold")]
    pub near_threshold_percent: f64,

    /// Exact matches shown by the daily popup
    #[serde(default = "default_popup_limit")]
    pub popup_limit: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            near_threshold_percent: default_near_threshold(),
            popup_limit: default_popup_limit(),
        }
    }
}

impl NotificationsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    crate::notifications::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_near_threshold() -> f64 {
    crate::alerts::DEFAULT_NEAR_THRESHOLD
}
fn default_popup_limit() -> usize {
    crate::notifications::DEFAULT_POPUP_LIMIT
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Default watchlist sort column
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Sort in descending order
    #[serde(default)]
    pub sort_descending: bool,

    /// Which extreme-price columns to show: full, high or low
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sort_by: default_sort_by(),
            sort_descending: false,
            view_mode: ViewMode::Full,
        }
    }
}

fn default_sort_by() -> String {
    "symbol".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject values the rest of the program cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.notifications.poll_interval_secs == 0 {
            bail!("notifications.poll_interval_secs must be greater than zero");
        }
        let near = self.notifications.near_threshold_percent;
        if near.is_nan() || near < 0.0 {
            bail!("notifications.near_threshold_percent must be zero or more");
        }
        Ok(())
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!(error = %e, "failed to load config, using defaults"),
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tickerwatch").join("config.toml"))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# tickerwatch configuration file

[api]
# Backend base URL
base_url = "http://localhost:5000"
# Request timeout in seconds
timeout = 10
# Bearer token (or set TICKERWATCH_TOKEN)
# token = "..."
# User id; looked up from the token when unset
# user_id = "..."

[limiter]
# Minimum gap between backend requests, in milliseconds
min_spacing_ms = 1000

[notifications]
# Seconds between alert refreshes in watch mode
poll_interval_secs = 60
# Alerts within this many percent of the price count as "near"
near_threshold_percent = 5.0
# Exact matches shown by the daily popup
popup_limit = 3

[display]
# Watchlist sort column: symbol, exchange, alert-price, price, vs-alert,
# previous-close, change-percent, day-high, vs-day-high, year-high,
# vs-year-high, day-low, vs-day-low, year-low, vs-year-low
sort_by = "symbol"
sort_descending = false
# full, high or low
view_mode = "full"
"##
}
