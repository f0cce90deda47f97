//! AssetFlow directory sync server.
//!
//! Wires the Graph directory adapter, the Postgres stores, the photo fetch
//! worker, and the job scheduler together, and serves health probes.

mod config;
mod health;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use assetflow_connector_graph::{Directory, GraphConfig, GraphDirectory};
use assetflow_sync::{
    DirectoryStore, FsPhotoStore, LeaseStore, LogNotifier, Notifications, PgDirectoryStore,
    PgLeaseStore, PhotoQueue, PhotoStore, PhotoWorker, Scheduler, SyncOrchestrator,
};
use config::Config;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        sync_interval_secs = config.sync_interval_secs,
        "Starting AssetFlow sync server"
    );

    let pool = match assetflow_db::connect(&config.database_url).await {
        Ok(pool) => {
            info!("Database connection established");
            pool
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = assetflow_db::run_migrations(&pool).await {
        eprintln!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let directory: Arc<dyn Directory> = match GraphDirectory::new(GraphConfig::default()) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            eprintln!("Failed to create Graph directory client: {e}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn DirectoryStore> = Arc::new(PgDirectoryStore::new(pool.clone()));
    let leases: Arc<dyn LeaseStore> = Arc::new(PgLeaseStore::new(pool.clone()));
    let photos: Arc<dyn PhotoStore> = Arc::new(FsPhotoStore::new(config.photo_storage_root.clone()));

    // Photo fetches run decoupled from sync; the queue is the only coupling.
    let (photo_queue, photo_rx) = PhotoQueue::new(config.photo_queue_capacity);
    let photo_worker = PhotoWorker::new(store.clone(), directory.clone(), photos);
    tokio::spawn(photo_worker.run(photo_rx));

    let orchestrator = Arc::new(
        SyncOrchestrator::new(store, directory)
            .with_photo_queue(photo_queue.clone(), config.photo_miss_policy()),
    );
    let notifications = Arc::new(Notifications::new(pool.clone(), Arc::new(LogNotifier)));

    let scheduler = Arc::new(Scheduler::new(
        config.scheduler_config(),
        orchestrator,
        notifications,
        leases,
    ));
    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Health endpoints listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, health::router(pool))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    scheduler.shutdown();
    drop(photo_queue);
    info!("Server shutdown complete");
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
