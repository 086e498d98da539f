//! Shared application state.
//!
//! Holds the configuration and the services every request handler needs.

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::services::{AccountService, AddressService, CartService, CatalogService};
use crate::store::Database;

/// Application state shared across all HTTP handlers. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Signs and validates bearer tokens.
    pub tokens: Arc<TokenService>,
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub addresses: AddressService,
    pub metrics: Metrics,
}

impl AppState {
    /// Wires every service to the same store handle.
    pub fn new(config: Arc<ConfigV1>, db: Database, metrics: Metrics) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt, db.clone()));
        AppState {
            accounts: AccountService::new(db.clone(), tokens.clone()),
            catalog: CatalogService::new(db.clone()),
            carts: CartService::new(db.clone()),
            addresses: AddressService::new(db),
            tokens,
            config,
            metrics,
        }
    }
}
