//! Feed Configuration Settings
//!
//! Configuration types for the quote feed, loaded from environment
//! variables with sensible defaults.

use std::time::Duration;

/// Default quote server endpoint.
const DEFAULT_ENDPOINT_URL: &str = "wss://wss.tradernet.com";

/// Default host for derived instrument logo URLs.
const DEFAULT_ICON_BASE_URL: &str = "https://tradernet.com";

/// Fixed delay before a failed connection is replaced.
const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_millis(1500);

/// Default capacity of the snapshot broadcast channel.
const DEFAULT_SNAPSHOT_CAPACITY: usize = 256;

/// The tracked instrument universe.
const DEFAULT_TICKERS: [&str; 32] = [
    "SP500.IDX",
    "AAPL.US",
    "RSTI",
    "GAZP",
    "MRKZ",
    "RUAL",
    "HYDR",
    "MRKS",
    "SBER",
    "FEES",
    "TGKA",
    "VTBR",
    "ANH.US",
    "VICL.US",
    "BURG.US",
    "NBL.US",
    "YETI.US",
    "WSFS.US",
    "NIO.US",
    "DXC.US",
    "MIC.US",
    "HSBC.US",
    "EXPN.EU",
    "GSK.EU",
    "SHP.EU",
    "MAN.EU",
    "DB1.EU",
    "MUV2.EU",
    "TATE.EU",
    "KGF.EU",
    "MGGT.EU",
    "SGGD.EU",
];

/// The default instrument universe as owned strings.
#[must_use]
pub fn default_tickers() -> Vec<String> {
    DEFAULT_TICKERS.iter().map(ToString::to_string).collect()
}

/// Complete quote feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Secure WebSocket URL of the quote server.
    pub endpoint_url: String,
    /// Base URL for derived instrument logo URLs.
    pub icon_base_url: String,
    /// Fixed delay applied before reconnecting after a failure.
    pub recovery_delay: Duration,
    /// Capacity of the snapshot broadcast channel.
    pub snapshot_capacity: usize,
    /// Instruments to subscribe to on every connection open.
    pub tickers: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            icon_base_url: DEFAULT_ICON_BASE_URL.to_string(),
            recovery_delay: DEFAULT_RECOVERY_DELAY,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
            tickers: default_tickers(),
        }
    }
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// Every key is optional and falls back to its default:
    /// `QUOTE_FEED_URL`, `QUOTE_FEED_ICON_BASE_URL`,
    /// `QUOTE_FEED_RECOVERY_DELAY_MS`, `QUOTE_FEED_SNAPSHOT_CAPACITY`,
    /// `QUOTE_FEED_TICKERS` (comma separated).
    ///
    /// # Errors
    ///
    /// Returns an error if a provided value is empty or the ticker list
    /// parses to nothing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint_url =
            std::env::var("QUOTE_FEED_URL").unwrap_or_else(|_| defaults.endpoint_url);
        if endpoint_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue("QUOTE_FEED_URL".to_string()));
        }

        let icon_base_url =
            std::env::var("QUOTE_FEED_ICON_BASE_URL").unwrap_or_else(|_| defaults.icon_base_url);
        if icon_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue(
                "QUOTE_FEED_ICON_BASE_URL".to_string(),
            ));
        }

        let recovery_delay =
            parse_env_duration_millis("QUOTE_FEED_RECOVERY_DELAY_MS", defaults.recovery_delay);

        let snapshot_capacity =
            parse_env_usize("QUOTE_FEED_SNAPSHOT_CAPACITY", defaults.snapshot_capacity);

        let tickers = match std::env::var("QUOTE_FEED_TICKERS") {
            Ok(raw) => {
                let tickers: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if tickers.is_empty() {
                    return Err(ConfigError::EmptyValue("QUOTE_FEED_TICKERS".to_string()));
                }
                tickers
            }
            Err(_) => defaults.tickers,
        };

        Ok(Self {
            endpoint_url,
            icon_base_url,
            recovery_delay,
            snapshot_capacity,
            tickers,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an empty or unusable value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
