//! Stream Codec
//!
//! Decodes inbound text frames from the quote server and encodes the
//! subscription request.
//!
//! Decoding is deliberately lossy: the live stream is mostly noise from our
//! perspective (other message kinds, keepalives, malformed frames), so
//! anything that is not a usable quote update yields `None` rather than an
//! error. Only the outbound path can fail in a way worth reporting.

use crate::domain::quote::QuoteDelta;

use super::messages::{QuoteUpdateMessage, SubscribeRequest};

/// Discriminator of the one inbound message kind we handle.
const QUOTE_DISCRIMINATOR: &str = "q";

/// Try to decode a text frame as a quote update.
///
/// Returns `None` for anything other than a well-formed `["q", {...}]`
/// frame carrying a ticker and a non-NaN change percentage: wrong
/// discriminator, unparseable JSON, a non-array payload, or a field map
/// that fails validation. None of these are error conditions.
#[must_use]
pub fn decode_quote(text: &str) -> Option<QuoteDelta> {
    let frame: serde_json::Value = serde_json::from_str(text).ok()?;
    let items = frame.as_array()?;

    if items.first()?.as_str()? != QUOTE_DISCRIMINATOR {
        return None;
    }

    let message: QuoteUpdateMessage = serde_json::from_value(items.get(1)?.clone()).ok()?;
    message.into_delta()
}

/// Encode the subscription request for the given tickers.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_subscribe(tickers: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SubscribeRequest::quotes(tickers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_quote_frame() {
        let delta = decode_quote(r#"["q", {"c": "AAPL.US", "pcp": 1.5, "ltp": 150.0}]"#).unwrap();

        assert_eq!(delta.ticker, "AAPL.US");
        assert!((delta.percent_change - 1.5).abs() < f64::EPSILON);
        assert_eq!(delta.last_trade_price, Some(150.0));
        assert!(delta.exchange.is_none());
    }

    #[test]
    fn rejects_other_discriminators() {
        assert!(decode_quote(r#"["userData", {"c": "AAPL.US", "pcp": 1.5}]"#).is_none());
        assert!(decode_quote(r#"["Q", {"c": "AAPL.US", "pcp": 1.5}]"#).is_none());
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(decode_quote("not json").is_none());
        assert!(decode_quote("{}").is_none());
        assert!(decode_quote("[]").is_none());
        assert!(decode_quote(r#"["q"]"#).is_none());
        assert!(decode_quote(r#"["q", 42]"#).is_none());
    }

    #[test]
    fn rejects_updates_without_change_value() {
        assert!(decode_quote(r#"["q", {"c": "AAPL.US"}]"#).is_none());
        assert!(decode_quote(r#"["q", {"c": "AAPL.US", "pcp": null}]"#).is_none());
    }

    #[test]
    fn ignores_unknown_fields() {
        let delta =
            decode_quote(r#"["q", {"c": "SBER", "pcp": -0.2, "bid": 101.5, "x_dot": 7}]"#).unwrap();
        assert_eq!(delta.ticker, "SBER");
    }

    #[test]
    fn encodes_the_subscription_request() {
        let tickers = vec!["SP500.IDX".to_string(), "RSTI".to_string()];
        assert_eq!(
            encode_subscribe(&tickers).unwrap(),
            r#"["quotes",["SP500.IDX","RSTI"]]"#
        );
    }
}
