//! Quote Server Adapter
//!
//! The WebSocket adapter for the quote server: transport connection,
//! connection state publisher, connection supervisor, wire codec, and the
//! ingestion pipeline that ties them together.
//!
//! # Data Flow
//!
//! ```text
//! socket ──raw event──► state feed ──┬─► supervisor   (failure path)
//!                                    └─► quote ingest (open + message paths)
//!                                              │
//!                                       cache merge ──► snapshot hub
//! ```

pub mod codec;
pub mod ingest;
pub mod messages;
pub mod socket;
pub mod state;
pub mod supervisor;

pub use ingest::{IngestError, QuoteIngest};
pub use messages::{QuoteUpdateMessage, SubscribeRequest};
pub use socket::{ConnectionHandle, SocketConnector};
pub use state::{SocketState, StateFeed};
pub use supervisor::ConnectionSupervisor;
