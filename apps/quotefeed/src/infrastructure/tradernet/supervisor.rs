//! Connection Supervisor
//!
//! Keeps exactly one connection alive. On failure the supervisor waits a
//! fixed recovery delay, force-closes the failed connection, opens a
//! replacement, and swaps it in as the active handle.
//!
//! Recovery is mutually exclusive: a second recovery request arriving while
//! one is in flight waits behind it, and a request for a connection that has
//! already been replaced is a no-op. This is the only exclusive critical
//! section in the pipeline.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use super::socket::{ConnectionHandle, SocketConnector};

/// Close code sent when force-closing a failed connection.
const ABNORMAL_CLOSURE: u16 = 1002;

/// Owner of the active connection and the reconnect-on-failure path.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    connector: SocketConnector,
    recovery_delay: Duration,
    active: Mutex<ConnectionHandle>,
    recovering: AsyncMutex<()>,
    shutdown: CancellationToken,
}

impl ConnectionSupervisor {
    /// Open the initial connection and take ownership of it.
    #[must_use]
    pub fn start(
        connector: SocketConnector,
        recovery_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let active = connector.open();
        Self {
            connector,
            recovery_delay,
            active: Mutex::new(active),
            recovering: AsyncMutex::new(()),
            shutdown,
        }
    }

    /// The currently active connection handle.
    #[must_use]
    pub fn current_connection(&self) -> ConnectionHandle {
        self.active.lock().clone()
    }

    /// Replace a failed connection with a fresh one.
    ///
    /// Waits the fixed recovery delay, force-closes `failed` (code 1002),
    /// opens a replacement and makes it the active handle. When `failed` is
    /// no longer the active connection the request is stale (an earlier
    /// recovery already replaced it) and nothing happens, which is what
    /// keeps two concurrent failure observations from producing two sockets.
    ///
    /// Never fails outward: if the replacement connection cannot be
    /// established, its `Failed` state event re-triggers recovery through
    /// the normal path.
    pub async fn recover_after_failure(&self, failed: Option<ConnectionHandle>) {
        let _serialized = self.recovering.lock().await;

        if let Some(failed) = &failed {
            if *failed != self.current_connection() {
                tracing::debug!(
                    connection = failed.id(),
                    "Skipping recovery for already-replaced connection"
                );
                return;
            }
        }

        tokio::select! {
            () = self.shutdown.cancelled() => return,
            () = tokio::time::sleep(self.recovery_delay) => {}
        }

        if let Some(failed) = failed {
            failed.close(ABNORMAL_CLOSURE, "").await;
        }

        let replacement = self.connector.open();
        tracing::info!(connection = replacement.id(), "Opened replacement connection");
        *self.active.lock() = replacement;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::super::state::StateFeed;
    use super::*;

    fn supervisor(recovery_delay: Duration) -> ConnectionSupervisor {
        let states = Arc::new(StateFeed::new());
        // Nothing listens here; connections fail fast, which is irrelevant
        // to the ownership behavior under test.
        let connector =
            SocketConnector::new("ws://127.0.0.1:9", states, CancellationToken::new());
        ConnectionSupervisor::start(connector, recovery_delay, CancellationToken::new())
    }

    #[tokio::test]
    async fn owns_an_active_connection_from_the_start() {
        let supervisor = supervisor(Duration::from_millis(10));
        let current = supervisor.current_connection();
        assert_eq!(current, supervisor.current_connection());
    }

    #[tokio::test]
    async fn recovery_replaces_the_active_connection() {
        let supervisor = supervisor(Duration::from_millis(10));
        let first = supervisor.current_connection();

        supervisor.recover_after_failure(Some(first.clone())).await;

        assert_ne!(supervisor.current_connection(), first);
    }

    #[tokio::test]
    async fn stale_recovery_is_a_no_op() {
        let supervisor = supervisor(Duration::from_millis(200));
        let first = supervisor.current_connection();

        supervisor.recover_after_failure(Some(first.clone())).await;
        let replacement = supervisor.current_connection();
        assert_ne!(replacement, first);

        // A second recovery for the already-replaced handle returns without
        // waiting out the delay or touching the active connection.
        let started = Instant::now();
        supervisor.recover_after_failure(Some(first)).await;
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(supervisor.current_connection(), replacement);
    }

    #[tokio::test]
    async fn concurrent_recoveries_open_one_replacement() {
        let supervisor = Arc::new(supervisor(Duration::from_millis(20)));
        let failed = supervisor.current_connection();

        let a = {
            let supervisor = Arc::clone(&supervisor);
            let failed = failed.clone();
            tokio::spawn(async move { supervisor.recover_after_failure(Some(failed)).await })
        };
        let b = {
            let supervisor = Arc::clone(&supervisor);
            let failed = failed.clone();
            tokio::spawn(async move { supervisor.recover_after_failure(Some(failed)).await })
        };

        let (ra, rb) = tokio::join!(a, b);
        ra.expect("task");
        rb.expect("task");

        // The first request replaced the connection; the second saw a stale
        // handle and did nothing. Exactly one replacement was opened.
        let replacement = supervisor.current_connection();
        assert_ne!(replacement, failed);
        assert_eq!(replacement.id(), failed.id() + 1);
    }
}
