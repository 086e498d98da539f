//! Application startup and server initialization.
//!
//! Connects the configured store, builds the shared state and serves the
//! router until the process is stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::AppState;
use crate::store::{create_store, Database};

/// Builds the application state for `config` on top of a freshly created
/// store.
pub async fn build_state(config: Arc<ConfigV1>) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = create_store(&config.store.backend).await?;
    let metrics = Metrics::new();
    let db = Database::new(
        store,
        Duration::from_secs(config.store.timeout_in_secs),
        metrics.clone(),
    );
    Ok(AppState::new(config, db, metrics))
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the store cannot be reached, the listen address cannot
/// be bound, or the server fails while running.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone()).await?;
    let app = routes::create_router(state);

    let address = config.listen_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Starting server on {}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
