//! HTTP route definitions and handlers.
//!
//! Routes are grouped by area: public user endpoints, catalog administration,
//! the bearer-protected cart and address endpoints, and the operational
//! health and metrics endpoints.

mod address_routes;
mod admin_routes;
mod cart_routes;
mod extract;
mod health_routes;
mod metrics;
mod user_routes;

pub use address_routes::AddressResponse;
pub use admin_routes::AddProductResponse;
pub use cart_routes::{CartResponse, OrderResponse};
pub use user_routes::{LoginResponse, ProductsResponse, SignupResponse};

use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::require_bearer;
use crate::state::AppState;

/// Body of responses that only confirm an action.
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn json(message: &str) -> Json<MessageResponse> {
        Json(MessageResponse {
            message: message.to_string(),
        })
    }
}

/// Creates the application router with all configured routes.
///
/// Cart and address routes only run after the bearer token has been
/// validated; everything else is public.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(cart_routes::routes())
        .merge(address_routes::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .merge(user_routes::routes())
        .merge(admin_routes::routes())
        .merge(protected)
        .merge(health_routes::routes())
        .merge(metrics::routes())
        .with_state(state)
}
