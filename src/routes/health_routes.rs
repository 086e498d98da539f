//! Health check endpoints.

use crate::state::AppState;
use axum::{
    body::Body,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Returns 200 OK while the process is serving requests. The store is not
/// consulted.
async fn health_check() -> impl IntoResponse {
    Response::new(Body::from("OK"))
}
