//! Queueline daemon - Main Entry Point
//!
//! Wires the SQLite store into the queue service and serves it over JSON-RPC.

mod config;
mod logging;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// Import workspace crates
use config::DaemonConfig;
use queueline_api_rpc::{RpcHandler, RpcServer};
use queueline_core::application::{QueueService, StoreChangeFeed};
use queueline_core::port::id_provider::{TimestampIdProvider, UuidProvider};
use queueline_core::port::time_provider::SystemTimeProvider;
use queueline_core::port::TimeProvider;
use queueline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    let _log_guard = logging::init(&config)?;

    info!("Queueline daemon v{} starting...", VERSION);

    // 3. Initialize database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteQueueStore::new(
        pool.clone(),
        time_provider.clone(),
        Arc::new(UuidProvider),
    ));
    let service = QueueService::new(
        store.clone(),
        Arc::new(TimestampIdProvider::new(time_provider)),
    );
    let feed = Arc::new(StoreChangeFeed::new(store));

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = RpcHandler::new(service, feed, config.public_url.clone());
    let (addr, rpc_handle) = RpcServer::new(config.rpc.clone(), handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, public_url = %config.public_url, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}
