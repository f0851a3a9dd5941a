//! WebSocket Transport Connection
//!
//! Owns the raw socket to the quote server. [`SocketConnector::open`] hands
//! back a [`ConnectionHandle`] immediately and performs the handshake in a
//! spawned task; the connection's lifecycle is reported exclusively through
//! the [`StateFeed`], never through return values.
//!
//! No retry logic lives here. A send or close on a connection that already
//! died is a silent no-op; transport faults surface as
//! [`SocketState::Failed`] and are the supervisor's problem.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;

use super::state::{SocketState, StateFeed};

/// Outbound command queue depth per connection.
const OUTBOUND_CAPACITY: usize = 64;

/// Close code for an orderly local shutdown.
const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the peer closed without a status frame.
const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug)]
enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

// =============================================================================
// Connection Handle
// =============================================================================

/// Lightweight reference to a single connection instance.
///
/// Cloning the handle does not clone the socket; all clones address the same
/// connection. Handles compare equal when they refer to the same instance,
/// which is how stale failure events are told apart from current ones.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: u64,
    commands: mpsc::Sender<Command>,
}

impl ConnectionHandle {
    /// Process-unique identifier of this connection instance.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Queue a text frame for sending.
    ///
    /// Best-effort: sending on a closed or failed connection does nothing.
    /// A send that fails at the socket is reported via the state feed.
    pub async fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Send(text.into())).await;
    }

    /// Close the connection with the given code and reason.
    ///
    /// Best-effort: closing an already-dead connection does nothing.
    pub async fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self
            .commands
            .send(Command::Close {
                code,
                reason: reason.into(),
            })
            .await;
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: u64) -> Self {
        let (commands, _rx) = mpsc::channel(1);
        Self { id, commands }
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

// =============================================================================
// Socket Connector
// =============================================================================

/// Factory for connection instances against a fixed endpoint.
///
/// Every opened connection publishes its lifecycle into the shared
/// [`StateFeed`]; the connector itself keeps no record of what it opened,
/// since ownership of the active handle lives with the supervisor.
#[derive(Debug)]
pub struct SocketConnector {
    url: String,
    states: Arc<StateFeed>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl SocketConnector {
    /// Create a connector for the given WebSocket endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>, states: Arc<StateFeed>, shutdown: CancellationToken) -> Self {
        Self {
            url: url.into(),
            states,
            next_id: AtomicU64::new(1),
            shutdown,
        }
    }

    /// Open a new connection.
    ///
    /// Returns the handle immediately; the handshake runs in a spawned task.
    /// Success is observed as [`SocketState::Open`], a failed handshake as
    /// [`SocketState::Failed`] carrying this same handle.
    pub fn open(&self) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (commands, command_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let handle = ConnectionHandle { id, commands };

        let url = self.url.clone();
        let states = Arc::clone(&self.states);
        let shutdown = self.shutdown.child_token();
        let task_handle = handle.clone();

        tokio::spawn(async move {
            run_connection(url, task_handle, command_rx, states, shutdown).await;
        });

        handle
    }
}

/// Connect and pump the socket until it terminates.
///
/// Terminal per instance: whichever of `Closing` / `Failed` / local close /
/// cancellation happens first ends the task, and a fresh connection starts
/// its own lifecycle.
async fn run_connection(
    url: String,
    handle: ConnectionHandle,
    mut commands: mpsc::Receiver<Command>,
    states: Arc<StateFeed>,
    shutdown: CancellationToken,
) {
    let ws_stream = tokio::select! {
        () = shutdown.cancelled() => return,
        result = tokio_tungstenite::connect_async(&url) => match result {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                tracing::warn!(connection = handle.id(), error = %e, "WebSocket connect failed");
                states.publish(SocketState::Failed(handle, e.to_string()));
                return;
            }
        },
    };

    tracing::info!(connection = handle.id(), url = %url, "WebSocket connected");
    states.publish(SocketState::Open(handle.clone()));

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                // Owning scope torn down: close the socket, don't abandon it.
                let _ = write.send(close_frame(NORMAL_CLOSURE, "shutdown")).await;
                return;
            }
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        states.publish(SocketState::Failed(handle.clone(), e.to_string()));
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    tracing::debug!(connection = handle.id(), code, "Closing connection");
                    let _ = write.send(close_frame(code, &reason)).await;
                    return;
                }
                None => return,
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    states.publish(SocketState::Message(handle.clone(), text.to_string()));
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(close))) => {
                    let (code, reason) = close.map_or_else(
                        || (NO_STATUS_RECEIVED, String::new()),
                        |frame| (u16::from(frame.code), frame.reason.to_string()),
                    );
                    tracing::info!(connection = handle.id(), code, "Server closed connection");
                    let _ = write.send(Message::Close(None)).await;
                    states.publish(SocketState::Closing(handle.clone(), code, reason));
                    return;
                }
                Some(Ok(_)) => {
                    // Binary and pong frames carry nothing for us.
                }
                Some(Err(e)) => {
                    states.publish(SocketState::Failed(handle.clone(), e.to_string()));
                    return;
                }
                None => {
                    states.publish(SocketState::Failed(
                        handle.clone(),
                        "stream ended".to_string(),
                    ));
                    return;
                }
            },
        }
    }
}

fn close_frame(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_instance() {
        let a = ConnectionHandle::for_tests(1);
        let b = ConnectionHandle::for_tests(2);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn send_on_dead_connection_is_a_no_op() {
        let handle = ConnectionHandle::for_tests(1);

        // The command receiver is already gone; neither call may block or panic.
        handle.send("[\"quotes\",[]]").await;
        handle.close(NORMAL_CLOSURE, "done").await;
    }

    #[tokio::test]
    async fn failed_handshake_publishes_failure() {
        let states = Arc::new(StateFeed::new());
        // Nothing listens on this port; the handshake fails fast.
        let connector = SocketConnector::new(
            "ws://127.0.0.1:9",
            Arc::clone(&states),
            CancellationToken::new(),
        );

        let handle = connector.open();
        let mut rx = states.subscribe();

        loop {
            rx.changed().await.expect("sender alive");
            let state = rx.borrow_and_update().clone();
            if let SocketState::Failed(failed, _error) = state {
                assert_eq!(failed, handle);
                return;
            }
        }
    }
}
