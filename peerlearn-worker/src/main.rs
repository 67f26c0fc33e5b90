//! # PeerLearn Worker
//!
//! Dispatches session reminders on an interval until Ctrl-C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/peerlearn \
//! REMINDER_POLL_INTERVAL_SECS=30 \
//! cargo run -p peerlearn-worker
//! ```

use anyhow::Context;
use peerlearn_shared::db::pool::{create_pool, DatabaseConfig};
use peerlearn_shared::realtime::RealtimeHub;
use peerlearn_worker::dispatcher::{ReminderDispatcher, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!(
        "PeerLearn Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: 2,
        ..Default::default()
    })
    .await
    .context("failed to connect to the database")?;

    let dispatcher = ReminderDispatcher::new(pool.clone(), RealtimeHub::new(), config);
    tokio::spawn(cancel_on_signal(dispatcher.shutdown_token()));

    dispatcher.run().await?;

    pool.close().await;
    tracing::info!("Worker stopped");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "peerlearn_worker=debug,peerlearn_shared=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
