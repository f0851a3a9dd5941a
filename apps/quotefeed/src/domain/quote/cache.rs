//! Keyed Quote Cache
//!
//! Holds the latest known record per ticker. The ingestion pipeline is the
//! sole writer; snapshot readers may run from other tasks concurrently.
//! Each record is read and written whole, so readers never observe a torn
//! record; a snapshot may or may not include a write that is concurrently
//! in flight.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{QuoteDelta, QuoteRecord, merge};

/// Concurrent ticker → record store with merge-on-apply semantics.
#[derive(Debug)]
pub struct QuoteCache {
    icon_base_url: String,
    records: RwLock<HashMap<String, QuoteRecord>>,
}

impl QuoteCache {
    /// Create an empty cache.
    ///
    /// `icon_base_url` is the host used to derive logo URLs at first
    /// sighting.
    #[must_use]
    pub fn new(icon_base_url: impl Into<String>) -> Self {
        Self {
            icon_base_url: icon_base_url.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Merge a delta into the record for its ticker and store the result.
    ///
    /// Lookup, merge, and store happen under one write lock so concurrent
    /// snapshot readers see either the old record or the new one, never an
    /// intermediate.
    pub fn apply(&self, delta: QuoteDelta) -> QuoteRecord {
        let mut records = self.records.write();
        let merged = merge(records.get(delta.ticker.as_str()), delta, &self.icon_base_url);
        records.insert(merged.ticker.clone(), merged.clone());
        merged
    }

    /// Get the cached record for a ticker, if one exists.
    #[must_use]
    pub fn get(&self, ticker: &str) -> Option<QuoteRecord> {
        self.records.read().get(ticker).cloned()
    }

    /// Clone the full cache contents. Unordered.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QuoteRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Number of tickers currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every cached record. Used for a full resync.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}
