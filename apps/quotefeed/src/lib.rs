#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! Quotefeed - Live Quote Ingestion Service
//!
//! Maintains a single WebSocket connection to the quote server, merges
//! incremental per-instrument updates into an in-memory snapshot, and
//! republishes the full snapshot to subscribers after every accepted
//! update. Failed connections are replaced automatically after a fixed
//! recovery delay.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote model and merge semantics
//!   - `quote`: Per-instrument records, delta merge rules, keyed cache
//!
//! - **Application**: Port definitions
//!   - `ports`: The consumer-facing `QuoteFeed` interface
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `tradernet`: WebSocket transport, state publisher, supervisor,
//!     wire codec, ingestion pipeline
//!   - `snapshot`: Broadcast fan-out of merged snapshots
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Tracing setup
//!
//! # Data Flow
//!
//! ```text
//! quote server WS ──► state feed ──┬─► supervisor (failure → reconnect)
//!                                  └─► quote ingest ──► cache merge
//!                                                           │
//!                                   consumer 1 ◄── snapshot hub ──► consumer N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote model and merge semantics.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::quote::{QuoteCache, QuoteDelta, QuoteRecord};

// Consumer port
pub use application::ports::QuoteFeed;

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedConfig, default_tickers};

// Snapshot hub (for integration tests)
pub use infrastructure::snapshot::{Snapshot, SnapshotEvent, SnapshotHub};

// Quote server adapter
pub use infrastructure::tradernet::{
    ConnectionHandle, ConnectionSupervisor, QuoteIngest, SocketConnector, SocketState, StateFeed,
};
