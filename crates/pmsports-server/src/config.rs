//! Application configuration.

use crate::error::{AppError, AppResult};
use pmsports_aggregator::{DEFAULT_API_URL, DEFAULT_MARKETS_PATH};
use pmsports_dashboard::DashboardConfig;
use pmsports_ws::{FeedConfig, DEFAULT_FEED_URL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Active markets path under `api_url`.
    #[serde(default = "default_markets_path")]
    pub markets_path: String,
    /// REST poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// How long a stats snapshot is served before `/stats` refreshes it.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_markets_path() -> String {
    DEFAULT_MARKETS_PATH.to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            markets_path: default_markets_path(),
            poll_interval_secs: default_poll_interval_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            feed: FeedSection::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// Live feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSection {
    /// Connect to the streaming endpoint at all.
    #[serde(default = "default_feed_enabled")]
    pub enabled: bool,
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Upper bound on a single backoff delay (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

fn default_feed_enabled() -> bool {
    true
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            enabled: default_feed_enabled(),
            url: default_feed_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl From<FeedSection> for FeedConfig {
    fn from(cfg: FeedSection) -> Self {
        Self {
            url: cfg.url,
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
        }
    }
}

impl AppConfig {
    /// Load from `path` if it exists, else defaults, then apply env overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("POLYMARKET_API").ok().as_deref(),
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply `PORT` and `POLYMARKET_API` style overrides.
    pub fn apply_overrides(&mut self, port: Option<&str>, api_url: Option<&str>) -> AppResult<()> {
        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            self.dashboard.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid PORT {port:?}: {e}")))?;
        }
        if let Some(api_url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            self.api_url = api_url.to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.feed.reconnect_base_delay_ms > self.feed.reconnect_max_delay_ms {
            return Err(AppError::Config(
                "feed.reconnect_base_delay_ms must not exceed feed.reconnect_max_delay_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_url, "https://clob.polymarket.com");
        assert_eq!(config.markets_path, "/active-markets");
        assert_eq!(config.dashboard.port, 3001);
        assert!(config.feed.enabled);
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            poll_interval_secs = 15

            [feed]
            enabled = false
            reconnect_base_delay_ms = 250

            [dashboard]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert!(!config.feed.enabled);
        assert_eq!(config.feed.reconnect_base_delay_ms, 250);
        assert_eq!(config.feed.reconnect_max_delay_ms, 30_000);
        assert_eq!(config.dashboard.port, 8080);
        assert_eq!(config.dashboard.max_connections, 32);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml("poll_interval_secs = \"soon\""),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(Some("4000"), Some("http://localhost:9000"))
            .unwrap();
        assert_eq!(config.dashboard.port, 4000);
        assert_eq!(config.api_url, "http://localhost:9000");

        config.apply_overrides(Some(""), None).unwrap();
        assert_eq!(config.dashboard.port, 4000);

        assert!(config.apply_overrides(Some("http"), None).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.feed.reconnect_base_delay_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feed_section_into_feed_config() {
        let feed: FeedConfig = FeedSection::default().into();
        assert_eq!(feed, FeedConfig::default());
    }

    #[test]
    fn test_shipped_config_parses() {
        let content = include_str!("../../../config/default.toml");
        let config = AppConfig::from_toml(content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard.port, 3001);
    }
}
