//! Port Interfaces
//!
//! The consumer-facing contract of the quote feed. The presentation side
//! sees exactly two operations: a snapshot subscription and an explicit
//! full-resync request. Connections, recovery, and caching all stay behind
//! this boundary.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::infrastructure::snapshot::SnapshotEvent;
use crate::infrastructure::tradernet::QuoteIngest;

/// The one interface exposed to feed consumers.
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Subscribe to the continuous sequence of full snapshots.
    ///
    /// The stream is latest-wins per the broadcast capacity: a consumer
    /// that lags may skip intermediate snapshots but always lands on a
    /// complete view. Transport failures are invisible here; snapshots
    /// simply pause until recovery completes.
    fn snapshots(&self) -> broadcast::Receiver<SnapshotEvent>;

    /// Drop every cached record and replace the active connection.
    ///
    /// The explicit retry path after a terminal
    /// [`SnapshotEvent::Aborted`], or whenever the consumer wants a full
    /// resync from the server.
    async fn clear_and_reconnect(&self);
}

#[async_trait]
impl QuoteFeed for QuoteIngest {
    fn snapshots(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.snapshots()
    }

    async fn clear_and_reconnect(&self) {
        self.clear_and_reconnect().await;
    }
}
