//! Feed Configuration
//!
//! Environment-driven configuration for the quote feed.

mod settings;

pub use settings::{ConfigError, FeedConfig, default_tickers};
