//! Shadow Ledger Reconciliation Server
//!
//! Materializes an event-sourced shadow ledger, detects drift against
//! externally reported balances and publishes self-healing corrections.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::file::StorageBackend;
use config::get_database_url;
use server::{build_router, run_server};
use slrec_core::correction::CorrectionGenerator;
use slrec_core::drift::DriftDetector;
use slrec_core::events::{EventLog, InProcessEventLog};
use slrec_core::ledger::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use slrec_core::materializer::Materializer;
use slrec_core::oracle::BalanceOracle;
use slrec_core::processors::LedgerConsumer;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Shadow Ledger Reconciliation - event-sourced balance verification service
#[derive(Parser, Debug)]
#[command(name = "slrec-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./slrec-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup (postgres backend only)
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting slrec-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::load(&args.config, args.listen).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = config.server.listen;

    // Set up the ledger store
    let (store, db_pool): (Arc<dyn LedgerStore>, Option<PgPool>) = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory ledger store");
            (Arc::new(MemoryLedgerStore::new()), None)
        }
        StorageBackend::Postgres => {
            let database_url = get_database_url().map_err(|e| {
                tracing::error!("DATABASE_URL environment variable not set");
                e
            })?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            if args.migrate {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("../migrations").run(&pool).await.map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
                tracing::info!("Migrations completed successfully");
            }

            (Arc::new(PgLedgerStore::new(pool.clone())), Some(pool))
        }
    };

    // Set up the event log and its consumer workers
    let materializer = Arc::new(Materializer::new(store.clone()));
    let (event_log, receivers) =
        InProcessEventLog::new(config.event_log.partitions, config.event_log.buffer);
    let event_log: Arc<dyn EventLog> = Arc::new(event_log);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers: Vec<_> = receivers
        .into_iter()
        .enumerate()
        .map(|(partition, rx)| {
            let consumer =
                LedgerConsumer::new(materializer.clone(), rx, shutdown_rx.clone(), partition);
            tokio::spawn(consumer.run())
        })
        .collect();
    tracing::info!(
        partitions = config.event_log.partitions,
        "ledger consumers started"
    );

    // Reconciliation engine
    let oracle = BalanceOracle::new(store);
    let detector = Arc::new(DriftDetector::new(
        oracle.clone(),
        CorrectionGenerator::new(event_log.clone()),
        config.reconciliation.tolerance,
        Duration::from_secs(config.reconciliation.correction_cooldown_secs),
    ));

    // Build the router
    let router = build_router(AppState {
        event_log,
        oracle,
        detector,
    });

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the consumer workers
    tracing::info!("Stopping ledger consumers...");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        worker.await?;
    }

    // Close database connections gracefully
    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
