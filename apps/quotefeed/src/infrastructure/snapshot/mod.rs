//! Snapshot Broadcast
//!
//! Fans the merged quote snapshot out to any number of subscribers using a
//! tokio broadcast channel. Every accepted merge publishes the entire
//! current cache contents, so each consumer always observes the full known
//! universe of instruments, not a delta stream.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::domain::quote::QuoteRecord;

/// Default capacity of the snapshot channel.
const DEFAULT_CAPACITY: usize = 256;

/// A point-in-time view of every cached instrument. Unordered.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// All currently cached records, one per ticker.
    pub records: Vec<QuoteRecord>,
    /// When this snapshot was published.
    pub as_of: DateTime<Utc>,
}

/// Event delivered to snapshot subscribers.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    /// A new full snapshot after an accepted merge.
    Snapshot(Snapshot),
    /// The ingestion pipeline died. Terminal until the consumer requests a
    /// resync via `clear_and_reconnect`.
    Aborted {
        /// What broke the pipeline.
        reason: String,
    },
}

/// Multi-subscriber snapshot publisher.
///
/// Transport-level recovery never shows up here; during a reconnect,
/// subscribers simply stop receiving snapshots until the feed is live again.
#[derive(Debug)]
pub struct SnapshotHub {
    tx: broadcast::Sender<SnapshotEvent>,
}

impl SnapshotHub {
    /// Create a hub with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Create a hub with default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Publish a full snapshot to all subscribers.
    ///
    /// Returns the number of receivers that got the event, or `None` if
    /// there are no active receivers.
    pub fn publish(&self, records: Vec<QuoteRecord>) -> Option<usize> {
        self.tx
            .send(SnapshotEvent::Snapshot(Snapshot {
                records,
                as_of: Utc::now(),
            }))
            .ok()
    }

    /// Publish the terminal abort event.
    pub fn publish_aborted(&self, reason: impl Into<String>) -> Option<usize> {
        self.tx
            .send(SnapshotEvent::Aborted {
                reason: reason.into(),
            })
            .ok()
    }

    /// Get a new snapshot receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.tx.subscribe()
    }

    /// Number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}
