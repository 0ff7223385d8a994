//! # Atlas Realtime Server
//!
//! The realtime sync binary: WebSocket endpoints, REST fallbacks and the
//! warranty expiry scheduler in one process.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atlas Server                                     │
//! │                                                                         │
//! │  Registers ───► HTTP/WS (8780) ───► Actors ───► SQLite                 │
//! │                                       ▲                                 │
//! │                                       │                                 │
//! │                                   Scheduler                             │
//! │                              (warranty expiry scan)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use atlas_db::{Database, DbConfig};
use atlas_realtime::actors::WarrantyActor;
use atlas_realtime::dispatch::LogDelivery;
use atlas_realtime::{router, AppState, RealtimeConfig, Scheduler, TickHandler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Atlas realtime server...");

    // Load configuration (ATLAS_CONFIG points at an explicit file)
    let config_path = std::env::var("ATLAS_CONFIG").ok().map(PathBuf::from);
    let config = RealtimeConfig::load(config_path)?;
    info!(
        bind = %config.server.bind_address(),
        db_path = %config.database.path.display(),
        "Configuration loaded"
    );

    // Open the database (migrations run on connect)
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(DbConfig::new(&config.database.path)).await?;
    info!("Database ready");

    // Wire the actors
    let warranty = Arc::new(WarrantyActor::new(
        &db,
        Arc::new(LogDelivery),
        config.scheduler.expiry_window_days,
    ));
    let state = AppState::new(db, warranty.clone(), config.notifications.buffer_capacity);

    // Arm the warranty expiry scan
    let scheduler = if config.scheduler.enabled {
        Some(Scheduler::arm(
            "warranty-expiry-scan",
            Duration::from_secs(config.scheduler.scan_interval_secs),
            warranty as Arc<dyn TickHandler>,
        ))
    } else {
        info!("Warranty scheduler disabled by config");
        None
    };

    // Serve
    let bind_addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Realtime server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(?e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
