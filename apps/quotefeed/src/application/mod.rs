//! Application Layer - Port definitions.
//!
//! This layer defines the contracts through which the presentation side
//! consumes the feed, keeping it decoupled from the transport adapters.

/// Consumer-facing port interfaces.
pub mod ports;
