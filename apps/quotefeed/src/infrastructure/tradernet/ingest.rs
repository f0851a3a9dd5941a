//! Quote Ingestion Pipeline
//!
//! Drives the quote feed off the connection state stream. Three independent
//! tasks run for the pipeline's lifetime:
//!
//! - the **open** task sends the subscription request whenever a connection
//!   comes up;
//! - the **failure** task hands failed connections to the supervisor;
//! - the **merge** task parses inbound frames, folds accepted deltas into
//!   the cache, and publishes the full snapshot after every merge.
//!
//! Open handling and failure recovery are deliberately separate tasks: a
//! recovery mid-backoff must not delay the subscription request for a
//! connection that just came up, and vice versa.
//!
//! The pipeline owns the [`QuoteCache`] and is its sole mutator.

use std::sync::Arc;

use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;

use crate::domain::quote::QuoteCache;
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::snapshot::{SnapshotEvent, SnapshotHub};

use super::codec;
use super::socket::ConnectionHandle;
use super::state::{SocketState, StateFeed};
use super::supervisor::ConnectionSupervisor;

/// Errors that can break the merge loop.
///
/// Transport faults never appear here; they are recovered by the
/// supervisor. Only a fault in the pipeline's own event loop is terminal.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The connection state feed closed underneath the pipeline.
    #[error("connection state feed closed")]
    StateFeedClosed,
}

/// The live-quote ingestion pipeline.
pub struct QuoteIngest {
    supervisor: Arc<ConnectionSupervisor>,
    states: Arc<StateFeed>,
    cache: QuoteCache,
    snapshots: SnapshotHub,
    tickers: Vec<String>,
    resume: Notify,
    shutdown: CancellationToken,
}

impl QuoteIngest {
    /// Create the pipeline.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    #[must_use]
    pub fn new(
        supervisor: Arc<ConnectionSupervisor>,
        states: Arc<StateFeed>,
        config: &FeedConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            supervisor,
            states,
            cache: QuoteCache::new(config.icon_base_url.clone()),
            snapshots: SnapshotHub::new(config.snapshot_capacity),
            tickers: config.tickers.clone(),
            resume: Notify::new(),
            shutdown,
        }
    }

    /// Spawn the pipeline tasks.
    pub fn start(self: &Arc<Self>) {
        let open = Arc::clone(self);
        tokio::spawn(async move { open.run_open_loop().await });

        let failure = Arc::clone(self);
        tokio::spawn(async move { failure.run_failure_loop().await });

        let merge = Arc::clone(self);
        tokio::spawn(async move { merge.run_merge_loop().await });
    }

    /// Subscribe to the continuous sequence of full snapshots.
    #[must_use]
    pub fn snapshots(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.snapshots.subscribe()
    }

    /// Empty the cache and replace the active connection for a full resync.
    ///
    /// Tears down the live socket (it is passed to the supervisor as the
    /// failed handle, so it is force-closed and replaced) and wakes the merge
    /// loop if a pipeline fault parked it.
    pub async fn clear_and_reconnect(&self) {
        tracing::info!("Clearing quote cache and recycling the connection");
        self.cache.clear();
        self.resume.notify_waiters();

        let current = self.supervisor.current_connection();
        self.supervisor.recover_after_failure(Some(current)).await;
    }

    /// React to `Open` states: send the subscription request.
    async fn run_open_loop(&self) {
        let mut states = self.states.subscribe();
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                changed = states.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let state = states.borrow_and_update().clone();
                    if let SocketState::Open(connection) = state {
                        self.send_subscribe(&connection).await;
                    }
                }
            }
        }
    }

    /// React to `Failed` states: hand the connection to the supervisor.
    async fn run_failure_loop(&self) {
        let mut states = self.states.subscribe();
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                changed = states.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let state = states.borrow_and_update().clone();
                    if let SocketState::Failed(connection, error) = state {
                        tracing::warn!(
                            connection = connection.id(),
                            error = %error,
                            "Connection failed, recovering"
                        );
                        self.supervisor.recover_after_failure(Some(connection)).await;
                    }
                }
            }
        }
    }

    /// Run the merge loop, surviving pipeline faults via explicit resync.
    ///
    /// A fault is published to subscribers exactly once as
    /// [`SnapshotEvent::Aborted`]; the loop then parks until a consumer
    /// calls [`clear_and_reconnect`](Self::clear_and_reconnect).
    async fn run_merge_loop(&self) {
        loop {
            let error = tokio::select! {
                () = self.shutdown.cancelled() => return,
                error = self.pump_messages() => error,
            };

            tracing::error!(error = %error, "Quote merge loop stopped");
            let _ = self.snapshots.publish_aborted(error.to_string());

            tokio::select! {
                () = self.shutdown.cancelled() => return,
                () = self.resume.notified() => {
                    tracing::info!("Quote merge loop resuming after resync request");
                }
            }
        }
    }

    /// Pump `Message` states through parse → merge → publish.
    ///
    /// Returns only when the state feed is gone.
    async fn pump_messages(&self) -> IngestError {
        let mut states = self.states.subscribe();
        loop {
            if states.changed().await.is_err() {
                return IngestError::StateFeedClosed;
            }

            let state = states.borrow_and_update().clone();
            let SocketState::Message(_, payload) = state else {
                continue;
            };

            if let Some(delta) = codec::decode_quote(&payload) {
                let record = self.cache.apply(delta);
                tracing::debug!(
                    ticker = %record.ticker,
                    changed = record.changed,
                    "Merged quote update"
                );
                // Subscribers always see the whole known universe.
                let _ = self.snapshots.publish(self.cache.snapshot());
            } else {
                tracing::trace!("Discarded non-quote frame");
            }
        }
    }

    async fn send_subscribe(&self, connection: &ConnectionHandle) {
        match codec::encode_subscribe(&self.tickers) {
            Ok(request) => {
                tracing::info!(
                    connection = connection.id(),
                    instruments = self.tickers.len(),
                    "Sending subscription request"
                );
                connection.send(request).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode subscription request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::super::socket::SocketConnector;
    use super::*;

    fn pipeline() -> (Arc<QuoteIngest>, Arc<StateFeed>) {
        let config = FeedConfig {
            tickers: vec!["AAPL.US".to_string(), "SBER".to_string()],
            ..FeedConfig::default()
        };
        let states = Arc::new(StateFeed::new());
        // Pre-cancelled transport: opened connections do nothing, so the
        // state feed carries only what the test publishes by hand.
        let transport_cancel = CancellationToken::new();
        transport_cancel.cancel();
        let connector = SocketConnector::new(
            "ws://127.0.0.1:9",
            Arc::clone(&states),
            transport_cancel.clone(),
        );
        let supervisor = Arc::new(ConnectionSupervisor::start(
            connector,
            std::time::Duration::from_millis(10),
            transport_cancel,
        ));
        let ingest = Arc::new(QuoteIngest::new(
            supervisor,
            Arc::clone(&states),
            &config,
            CancellationToken::new(),
        ));
        (ingest, states)
    }

    #[tokio::test]
    async fn accepted_messages_publish_full_snapshots() {
        let (ingest, states) = pipeline();
        ingest.start();
        let mut snapshots = ingest.snapshots();

        let connection = ConnectionHandle::for_tests(100);
        states.publish(SocketState::Message(
            connection.clone(),
            r#"["q", {"c": "AAPL.US", "pcp": 1.5, "ltp": 150.0}]"#.to_string(),
        ));

        let event = snapshots.recv().await.expect("snapshot");
        let SnapshotEvent::Snapshot(snapshot) = event else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].ticker, "AAPL.US");

        states.publish(SocketState::Message(
            connection,
            r#"["q", {"c": "SBER", "pcp": -0.2}]"#.to_string(),
        ));

        let event = snapshots.recv().await.expect("snapshot");
        let SnapshotEvent::Snapshot(snapshot) = event else {
            panic!("expected snapshot");
        };
        // Full cache view, not just the latest record.
        assert_eq!(snapshot.records.len(), 2);
    }

    #[tokio::test]
    async fn noise_produces_no_snapshot() {
        let (ingest, states) = pipeline();
        ingest.start();
        let mut snapshots = ingest.snapshots();

        let connection = ConnectionHandle::for_tests(100);
        for payload in [
            "not json",
            r#"["userData", {}]"#,
            r#"["q", {"c": "AAPL.US"}]"#,
        ] {
            states.publish(SocketState::Message(connection.clone(), payload.to_string()));
            // Give the merge task a chance to (not) react.
            tokio::task::yield_now().await;
        }

        // The only snapshot to ever arrive is for the one valid update.
        states.publish(SocketState::Message(
            connection,
            r#"["q", {"c": "AAPL.US", "pcp": 2.0}]"#.to_string(),
        ));

        let event = snapshots.recv().await.expect("snapshot");
        let SnapshotEvent::Snapshot(snapshot) = event else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.records.len(), 1);
        assert!((snapshot.records[0].percent_change_from_last_close - 2.0).abs() < f64::EPSILON);
        assert!(snapshots.try_recv().is_err());
    }
}
