//! Connection State Publisher
//!
//! Translates raw socket callbacks into an observable sequence of discrete
//! state values. Backed by a single-slot `watch` cell: late subscribers
//! immediately observe the most recently published state, and a subscriber
//! that cannot keep up skips straight to the latest value. Intermediate
//! states are dropped, never queued.
//!
//! Consumers must treat the stream as latest-wins and never assume every
//! transition is delivered.

use tokio::sync::watch;

use super::socket::ConnectionHandle;

/// Observable lifecycle state of the transport socket.
///
/// Each connection instance runs its own lifecycle; `Closing` and `Failed`
/// are terminal per instance, and a replacement connection starts over from
/// `Open`.
#[derive(Debug, Clone)]
pub enum SocketState {
    /// No connection activity observed yet.
    Idle,
    /// Socket established and ready to send.
    Open(ConnectionHandle),
    /// Text frame received on the socket.
    Message(ConnectionHandle, String),
    /// Server initiated an orderly close with the given code and reason.
    Closing(ConnectionHandle, u16, String),
    /// The connection failed: handshake error, transport error, or the
    /// stream ending unexpectedly.
    Failed(ConnectionHandle, String),
}

impl SocketState {
    /// The connection this state refers to, if any.
    #[must_use]
    pub const fn connection(&self) -> Option<&ConnectionHandle> {
        match self {
            Self::Idle => None,
            Self::Open(connection)
            | Self::Message(connection, _)
            | Self::Closing(connection, _, _)
            | Self::Failed(connection, _) => Some(connection),
        }
    }
}

/// Multi-subscriber, latest-wins publisher of [`SocketState`] values.
#[derive(Debug)]
pub struct StateFeed {
    tx: watch::Sender<SocketState>,
}

impl StateFeed {
    /// Create a feed holding the initial [`SocketState::Idle`] state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SocketState::Idle);
        Self { tx }
    }

    /// Publish a state, replacing the current value.
    ///
    /// Succeeds regardless of subscriber count; subscribers that are mid-read
    /// simply pick up the newest value on their next poll.
    pub fn publish(&self, state: SocketState) {
        let _previous = self.tx.send_replace(state);
    }

    /// Attach a new subscriber.
    ///
    /// The receiver is primed so its first poll yields the current state:
    /// late subscribers do not race the transport callbacks for the value
    /// that is already in effect.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SocketState> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }

    /// The most recently published state.
    #[must_use]
    pub fn current(&self) -> SocketState {
        self.tx.borrow().clone()
    }
}

impl Default for StateFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> ConnectionHandle {
        ConnectionHandle::for_tests(id)
    }

    #[tokio::test]
    async fn late_subscriber_sees_current_state() {
        let feed = StateFeed::new();
        feed.publish(SocketState::Open(handle(1)));

        let mut rx = feed.subscribe();
        rx.changed().await.expect("sender alive");

        match &*rx.borrow_and_update() {
            SocketState::Open(connection) => assert_eq!(connection.id(), 1),
            other => panic!("expected Open, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_subscriber_skips_to_latest() {
        let feed = StateFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(SocketState::Open(handle(1)));
        feed.publish(SocketState::Message(handle(1), "first".to_string()));
        feed.publish(SocketState::Message(handle(1), "second".to_string()));

        rx.changed().await.expect("sender alive");
        match &*rx.borrow_and_update() {
            SocketState::Message(_, text) => assert_eq!(text, "second"),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_observe_independently() {
        let feed = StateFeed::new();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        feed.publish(SocketState::Failed(handle(7), "boom".to_string()));

        a.changed().await.expect("sender alive");
        b.changed().await.expect("sender alive");

        for rx in [&mut a, &mut b] {
            match &*rx.borrow_and_update() {
                SocketState::Failed(connection, error) => {
                    assert_eq!(connection.id(), 7);
                    assert_eq!(error, "boom");
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }
    }

    #[test]
    fn initial_state_is_idle() {
        let feed = StateFeed::new();
        assert!(matches!(feed.current(), SocketState::Idle));
        assert!(feed.current().connection().is_none());
    }
}
