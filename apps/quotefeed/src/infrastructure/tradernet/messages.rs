//! Quote Server Wire Types
//!
//! Wire format types for the quote server's text frames.
//!
//! # Message Types
//!
//! ## Outbound
//! - `SubscribeRequest`: `["quotes", ["SP500.IDX", "AAPL.US", ...]]`,
//!   sent once per successful connection open.
//!
//! ## Inbound
//! - Quote update: `["q", { ... }]` where the field map carries partial
//!   per-instrument state. All fields are optional on the wire; a message
//!   is only usable when it names a ticker and carries an actionable
//!   change-percentage value.

use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteDelta;

/// Outbound subscription request.
///
/// Serializes as a two-element array: the literal `"quotes"` action followed
/// by the instrument list.
///
/// # Wire Format (JSON)
/// ```json
/// ["quotes", ["SP500.IDX", "AAPL.US"]]
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest<'a>(&'static str, &'a [String]);

impl<'a> SubscribeRequest<'a> {
    /// Build a quotes subscription for the given tickers.
    #[must_use]
    pub const fn quotes(tickers: &'a [String]) -> Self {
        Self("quotes", tickers)
    }
}

/// Inbound quote update field map (second element of a `["q", {...}]` frame).
///
/// # Wire Format (JSON)
/// ```json
/// ["q", {"c": "AAPL.US", "pcp": 1.5, "ltr": "NASDAQ", "name": "Apple", "ltp": 150.0, "chg": 2.2}]
/// ```
///
/// Unknown fields are ignored; the server sends more than we track.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuoteUpdateMessage {
    /// Instrument ticker. A message without it is unusable.
    #[serde(rename = "c", default)]
    pub ticker: Option<String>,

    /// Percent change from last close. Absent or NaN means the message
    /// carries no actionable update and is discarded whole.
    #[serde(rename = "pcp", default)]
    pub percent_change: Option<f64>,

    /// Exchange of the last trade.
    #[serde(rename = "ltr", default)]
    pub last_trade_exchange: Option<String>,

    /// Instrument display name.
    #[serde(rename = "name", default)]
    pub name: Option<String>,

    /// Fallback display name, used when `name` is absent.
    #[serde(rename = "name2", default)]
    pub name_fallback: Option<String>,

    /// Last trade price.
    #[serde(rename = "ltp", default)]
    pub last_trade_price: Option<f64>,

    /// Price change in points from last close.
    #[serde(rename = "chg", default)]
    pub price_change_points: Option<f64>,
}

impl QuoteUpdateMessage {
    /// Convert into a validated domain delta.
    ///
    /// Returns `None` when the message is unusable: no ticker, or an
    /// absent/NaN change percentage. Blank strings and NaN numerics in
    /// optional fields are normalized to absent so the merge retains the
    /// cached values.
    #[must_use]
    pub fn into_delta(self) -> Option<QuoteDelta> {
        let ticker = non_blank(self.ticker)?;
        let percent_change = finite(self.percent_change)?;

        Some(QuoteDelta {
            ticker,
            percent_change,
            exchange: non_blank(self.last_trade_exchange),
            name: non_blank(self.name).or_else(|| non_blank(self.name_fallback)),
            last_trade_price: finite(self.last_trade_price),
            price_change_points: finite(self.price_change_points),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(ticker: Option<&str>, pcp: Option<f64>) -> QuoteUpdateMessage {
        QuoteUpdateMessage {
            ticker: ticker.map(str::to_string),
            percent_change: pcp,
            ..QuoteUpdateMessage::default()
        }
    }

    #[test]
    fn subscribe_request_serializes_as_two_element_array() {
        let tickers = vec!["SP500.IDX".to_string(), "AAPL.US".to_string()];
        let json = serde_json::to_string(&SubscribeRequest::quotes(&tickers)).unwrap();
        assert_eq!(json, r#"["quotes",["SP500.IDX","AAPL.US"]]"#);
    }

    #[test]
    fn delta_requires_a_ticker() {
        assert!(message(None, Some(1.0)).into_delta().is_none());
        assert!(message(Some("  "), Some(1.0)).into_delta().is_none());
    }

    #[test]
    fn delta_requires_an_actionable_change_value() {
        assert!(message(Some("AAPL.US"), None).into_delta().is_none());
        assert!(message(Some("AAPL.US"), Some(f64::NAN)).into_delta().is_none());
    }

    #[test]
    fn blank_optional_fields_normalize_to_absent() {
        let update = QuoteUpdateMessage {
            last_trade_exchange: Some("   ".to_string()),
            ..message(Some("AAPL.US"), Some(1.0))
        };

        let delta = update.into_delta().unwrap();
        assert!(delta.exchange.is_none());
    }

    #[test]
    fn nan_optional_numerics_normalize_to_absent() {
        let update = QuoteUpdateMessage {
            last_trade_price: Some(f64::NAN),
            price_change_points: Some(0.4),
            ..message(Some("AAPL.US"), Some(1.0))
        };

        let delta = update.into_delta().unwrap();
        assert!(delta.last_trade_price.is_none());
        assert_eq!(delta.price_change_points, Some(0.4));
    }

    #[test]
    fn name_prefers_primary_over_fallback() {
        let update = QuoteUpdateMessage {
            name: Some("Apple Inc.".to_string()),
            name_fallback: Some("AAPL".to_string()),
            ..message(Some("AAPL.US"), Some(1.0))
        };
        assert_eq!(update.into_delta().unwrap().name.as_deref(), Some("Apple Inc."));

        let update = QuoteUpdateMessage {
            name: None,
            name_fallback: Some("AAPL".to_string()),
            ..message(Some("AAPL.US"), Some(1.0))
        };
        assert_eq!(update.into_delta().unwrap().name.as_deref(), Some("AAPL"));
    }
}
