use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod document_store;
mod domain;
mod metrics;
mod record_store;

use config::{Config, StoreBackend};
use document_store::{DocumentStore, MemoryDocumentStore, ScyllaDocumentStore};
use record_store::RecordStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, INFO by default, override with RUST_LOG
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,research_notes=debug")),
        )
        .init();

    tracing::info!("🚀 Starting research notes service");

    // === 1. Configuration ===
    let config = Config::load()?;
    tracing::info!(
        http_addr = %config.http_addr,
        store = ?config.store,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    // === 2. Document store ===
    let store: Arc<dyn DocumentStore> = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Arc::new(MemoryDocumentStore::new())
        }
        StoreBackend::Scylla => {
            tracing::info!("Connecting to ScyllaDB...");
            let store = ScyllaDocumentStore::connect(&config.scylla_nodes, &config.keyspace).await?;
            Arc::new(store)
        }
    };

    // === 3. Metrics ===
    let metrics = Arc::new(
        metrics::Metrics::new().map_err(|e| anyhow::anyhow!("Failed to create metrics: {}", e))?,
    );
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // === 4. HTTP API ===
    let state = api::AppState {
        notes: RecordStore::new(store),
        metrics,
        request_timeout: config.request_timeout,
    };
    api::start_server(state, config.http_addr).await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}
