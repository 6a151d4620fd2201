//! Configuration for the VWAP engine.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, net::SocketAddr, path::Path};
use url::Url;

use crate::market_data::coinbase::{MessageFilter, DEFAULT_COINBASE_URL, MATCH};
use crate::utils::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General application settings
    #[serde(default)]
    pub app: AppConfig,
    /// Market data feed settings
    #[serde(default)]
    pub feed: FeedConfig,
    /// Sliding window settings
    #[serde(default)]
    pub vwap: VwapConfig,
    /// Prometheus exporter settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Application-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Market data feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Websocket endpoint
    pub url: String,
    /// Product ids to subscribe to, e.g. "BTC-USD"
    pub trading_pairs: Vec<String>,
    /// Message `type` values treated as trades
    #[serde(default = "default_trade_kinds")]
    pub trade_kinds: Vec<String>,
    /// Bound of each channel between transport and engine
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Handshake retries before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Delay between handshake retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Sliding window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapConfig {
    /// Number of most recent trades per symbol
    pub window_size: usize,
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Scrape endpoint address; metrics are disabled when unset
    pub listen_addr: Option<SocketAddr>,
}

fn default_trade_kinds() -> Vec<String> {
    vec![MATCH.to_string()]
}

fn default_channel_capacity() -> usize {
    1
}

fn default_max_retries() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_COINBASE_URL.to_string(),
            trading_pairs: ["BTC-USD", "ETH-USD", "ETH-BTC"].iter().map(|s| s.to_string()).collect(),
            trade_kinds: default_trade_kinds(),
            channel_capacity: default_channel_capacity(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self { window_size: 200 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            feed: FeedConfig::default(),
            vwap: VwapConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the default configuration as a TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    pub fn message_filter(&self) -> MessageFilter {
        MessageFilter::new(self.feed.trade_kinds.iter().cloned())
    }

    /// Check the values the engine and transport rely on.
    pub fn validate(&self) -> Result<()> {
        if self.feed.url.trim().is_empty() {
            return Err(Error::Config("feed.url is required".into()));
        }
        Url::parse(&self.feed.url)
            .map_err(|e| Error::Config(format!("feed.url {:?}: {}", self.feed.url, e)))?;

        if self.feed.trading_pairs.is_empty() {
            return Err(Error::Config("feed.trading_pairs must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for pair in &self.feed.trading_pairs {
            if pair.trim().is_empty() {
                return Err(Error::Config("feed.trading_pairs contains an empty entry".into()));
            }
            if !seen.insert(pair.as_str()) {
                return Err(Error::Config(format!("feed.trading_pairs lists {} twice", pair)));
            }
        }

        if self.feed.trade_kinds.is_empty() {
            return Err(Error::Config("feed.trade_kinds must not be empty".into()));
        }
        if self.feed.channel_capacity == 0 {
            return Err(Error::Config("feed.channel_capacity must be at least 1".into()));
        }
        if self.vwap.window_size == 0 {
            return Err(Error::Config("vwap.window_size of non-zero size is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.feed.url, DEFAULT_COINBASE_URL);
        assert_eq!(config.feed.trading_pairs, vec!["BTC-USD", "ETH-USD", "ETH-BTC"]);
        assert_eq!(config.vwap.window_size, 200);
        assert_eq!(config.metrics.listen_addr, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_config_round_trip() {
        let mut config = Config::default();
        config.vwap.window_size = 50;
        config.metrics.listen_addr = Some("127.0.0.1:9000".parse().unwrap());

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            url = "wss://example.test/feed"
            trading_pairs = ["SOL-USD"]

            [vwap]
            window_size = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.trade_kinds, vec!["match"]);
        assert_eq!(config.feed.channel_capacity, 1);
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.vwap.window_size, 3);
        config.validate().unwrap();
    }

    #[test]
    fn test_default_toml_parses_back() {
        let text = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.vwap.window_size = 0;
        assert_matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("window_size"));

        let mut config = Config::default();
        config.feed.trading_pairs.clear();
        assert_matches!(config.validate(), Err(Error::Config(_)));

        let mut config = Config::default();
        config.feed.trading_pairs.push("BTC-USD".into());
        assert_matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("twice"));

        let mut config = Config::default();
        config.feed.url = "".into();
        assert_matches!(config.validate(), Err(Error::Config(_)));

        let mut config = Config::default();
        config.feed.url = "no scheme".into();
        assert_matches!(config.validate(), Err(Error::Config(_)));

        let mut config = Config::default();
        config.feed.channel_capacity = 0;
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_message_filter_follows_trade_kinds() {
        let mut config = Config::default();
        config.feed.trade_kinds = vec!["match".into(), "last_match".into()];
        let filter = config.message_filter();
        assert!(filter.is_trade("last_match"));
        assert!(!filter.is_trade("ticker"));
    }
}
