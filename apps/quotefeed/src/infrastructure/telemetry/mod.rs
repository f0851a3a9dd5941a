//! Tracing Setup
//!
//! Installs the global `tracing` subscriber: a compact fmt layer filtered
//! by `RUST_LOG`, defaulting the crate's own events to info.
//!
//! # Usage
//!
//! ```ignore
//! quotefeed::infrastructure::telemetry::init();
//! tracing::info!("Starting quote feed");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global subscriber.
///
/// Call once at binary startup. Panics if a global subscriber is already
/// installed, which is a wiring bug worth failing loudly on.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        "quotefeed=info"
            .parse()
            .expect("static directive 'quotefeed=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
