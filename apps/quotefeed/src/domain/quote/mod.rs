//! Instrument Quote Model
//!
//! Canonical per-instrument quote state and the merge rules for folding
//! incremental updates into it.
//!
//! # Merge semantics
//!
//! Updates are partial: a field absent from an incoming delta retains its
//! previously cached value, never resets to a default. The `changed` /
//! `changed_direction_up` flags describe only the delta between the
//! immediately preceding cached value and this update; they are not
//! cumulative history.

use serde::Serialize;

pub mod cache;

pub use cache::QuoteCache;

// =============================================================================
// Quote Record
// =============================================================================

/// Latest known state for a single instrument.
///
/// One record exists per ticker. Instruments that have not produced an
/// accepted update yet are simply absent from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    /// Unique instrument identifier (e.g., "AAPL.US"). Immutable.
    pub ticker: String,

    /// Percent change versus the previous session close.
    pub percent_change_from_last_close: f64,

    /// Exchange where the last trade printed. May be empty.
    pub last_trade_exchange_name: String,

    /// Instrument display name. May be empty.
    pub instrument_name: String,

    /// Latest traded price.
    pub last_trade_price: f64,

    /// Absolute price change in points versus the previous session close.
    pub price_change_points_from_last_close: f64,

    /// Logo URL derived from the ticker, computed once at first sighting.
    pub icon_url: Option<String>,

    /// Whether this update altered the percent change versus the cached value.
    pub changed: bool,

    /// Whether the altered percent change was an increase. Only meaningful
    /// when `changed` is true.
    pub changed_direction_up: bool,
}

// =============================================================================
// Quote Delta
// =============================================================================

/// A validated incremental update for a single instrument.
///
/// Construction guarantees the percent change is present and non-NaN; the
/// wire layer discards messages without an actionable change value before
/// they reach the merge path. Optional fields are `None` when the update did
/// not carry them (absent, NaN, or blank on the wire).
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDelta {
    /// Instrument ticker.
    pub ticker: String,
    /// Percent change versus previous close. Always finite or at least
    /// non-NaN; the NaN-means-unknown convention stops at the wire boundary.
    pub percent_change: f64,
    /// Exchange of the last trade, if carried by this update.
    pub exchange: Option<String>,
    /// Instrument display name, if carried by this update.
    pub name: Option<String>,
    /// Last trade price, if carried by this update.
    pub last_trade_price: Option<f64>,
    /// Price change in points, if carried by this update.
    pub price_change_points: Option<f64>,
}

impl QuoteDelta {
    /// Build the first-sighting record for an unseen ticker.
    ///
    /// Absent optional fields default to `0.0` / empty string (not NaN), so
    /// records are always displayable. A brand-new record never reports a
    /// change: there is no prior value to compare against.
    #[must_use]
    pub fn into_record(self, icon_base_url: &str) -> QuoteRecord {
        let icon_url = icon_url(icon_base_url, &self.ticker);
        QuoteRecord {
            ticker: self.ticker,
            percent_change_from_last_close: self.percent_change,
            last_trade_exchange_name: self.exchange.unwrap_or_default(),
            instrument_name: self.name.unwrap_or_default(),
            last_trade_price: self.last_trade_price.unwrap_or(0.0),
            price_change_points_from_last_close: self.price_change_points.unwrap_or(0.0),
            icon_url: Some(icon_url),
            changed: false,
            changed_direction_up: false,
        }
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Fold a delta into the cached record for its ticker.
///
/// With no cached record this is a first sighting (see
/// [`QuoteDelta::into_record`]). Otherwise the percent change is compared
/// exactly against the cached value to derive the change flags, and every
/// other field takes the incoming value only when the delta carries one.
#[must_use]
pub fn merge(cached: Option<&QuoteRecord>, delta: QuoteDelta, icon_base_url: &str) -> QuoteRecord {
    let Some(prev) = cached else {
        return delta.into_record(icon_base_url);
    };

    let changed = delta.percent_change != prev.percent_change_from_last_close;
    let changed_direction_up = changed && delta.percent_change > prev.percent_change_from_last_close;

    QuoteRecord {
        ticker: prev.ticker.clone(),
        percent_change_from_last_close: delta.percent_change,
        last_trade_exchange_name: delta
            .exchange
            .unwrap_or_else(|| prev.last_trade_exchange_name.clone()),
        instrument_name: delta.name.unwrap_or_else(|| prev.instrument_name.clone()),
        last_trade_price: delta.last_trade_price.unwrap_or(prev.last_trade_price),
        price_change_points_from_last_close: delta
            .price_change_points
            .unwrap_or(prev.price_change_points_from_last_close),
        icon_url: prev.icon_url.clone(),
        changed,
        changed_direction_up,
    }
}

/// Derive the logo URL for a ticker.
///
/// Deterministic function of the ticker only; computed once at first
/// sighting and carried unchanged on every subsequent merge.
#[must_use]
pub fn icon_url(base_url: &str, ticker: &str) -> String {
    format!("{base_url}/logos/get-logo-by-ticker?ticker={ticker}")
}

// =============================================================================
// Tests
// =============================================================================
