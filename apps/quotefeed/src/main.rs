//! Quotefeed Binary
//!
//! Starts the live quote feed and logs a one-line summary per snapshot.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quotefeed
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `QUOTE_FEED_URL`: Quote server WebSocket URL (default: wss://wss.tradernet.com)
//! - `QUOTE_FEED_ICON_BASE_URL`: Logo URL host (default: <https://tradernet.com>)
//! - `QUOTE_FEED_RECOVERY_DELAY_MS`: Reconnect delay after failure (default: 1500)
//! - `QUOTE_FEED_SNAPSHOT_CAPACITY`: Snapshot channel capacity (default: 256)
//! - `QUOTE_FEED_TICKERS`: Comma-separated instrument list (default: built-in universe)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use quotefeed::infrastructure::telemetry;
use quotefeed::{
    ConnectionSupervisor, FeedConfig, QuoteIngest, SnapshotEvent, SocketConnector, StateFeed,
};
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting quotefeed");

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Wire the pipeline: state feed → connector → supervisor → ingest.
    let states = Arc::new(StateFeed::new());
    let connector = SocketConnector::new(
        config.endpoint_url.clone(),
        Arc::clone(&states),
        shutdown_token.clone(),
    );
    let supervisor = Arc::new(ConnectionSupervisor::start(
        connector,
        config.recovery_delay,
        shutdown_token.clone(),
    ));
    let ingest = Arc::new(QuoteIngest::new(
        Arc::clone(&supervisor),
        states,
        &config,
        shutdown_token.clone(),
    ));
    ingest.start();

    // Console consumer: one line per snapshot.
    let snapshots = ingest.snapshots();
    let consumer_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        consume_snapshots(snapshots, consumer_shutdown).await;
    });

    tracing::info!("Quote feed ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Quote feed stopped");
    Ok(())
}

/// Log snapshot summaries until shutdown.
async fn consume_snapshots(
    mut snapshots: broadcast::Receiver<SnapshotEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            event = snapshots.recv() => match event {
                Ok(SnapshotEvent::Snapshot(snapshot)) => {
                    tracing::info!(
                        instruments = snapshot.records.len(),
                        as_of = %snapshot.as_of,
                        "Snapshot updated"
                    );
                }
                Ok(SnapshotEvent::Aborted { reason }) => {
                    tracing::error!(%reason, "Feed aborted; an explicit resync is required");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Snapshot consumer lagged, resuming from latest");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        endpoint = %config.endpoint_url,
        instruments = config.tickers.len(),
        recovery_delay_ms = config.recovery_delay.as_millis(),
        snapshot_capacity = config.snapshot_capacity,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    // Cancelling tears down every pipeline task and closes the live socket.
    shutdown_token.cancel();
}
