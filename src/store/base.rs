use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use tracing::info;

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::StoreBackend;
use crate::error::StoreError;
use crate::models::{Address, AddressKind, LineItem, Order, Product, User};

/// The Store trait abstracts the document store holding users and products.
///
/// Every mutating method is a single atomic update of one document. Methods
/// returning `bool` report whether a user document matched the filter.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend_name(&self) -> &str;

    /// Inserts a new user. Fails with `Duplicate("email")` or
    /// `Duplicate("phone")` when either is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, user_id: &ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn set_refresh_token(
        &self,
        user_id: &ObjectId,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Inserts a product. Fails with `Duplicate("_id")` when the id exists.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn find_product(&self, product_id: &ObjectId) -> Result<Option<Product>, StoreError>;
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    /// Case-insensitive literal substring match on the product name.
    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, StoreError>;

    async fn push_cart_item(&self, user_id: &ObjectId, item: &LineItem)
        -> Result<bool, StoreError>;
    /// Removes every cart entry whose product id equals `product_id`.
    async fn pull_cart_items(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<bool, StoreError>;
    /// Appends `order` and empties the cart, but only while the cart still
    /// equals `expected_cart` and no stored order carries the same
    /// idempotency key. Returns `false` when those conditions do not hold.
    async fn commit_checkout(
        &self,
        user_id: &ObjectId,
        expected_cart: &[LineItem],
        order: &Order,
    ) -> Result<bool, StoreError>;
    async fn push_order(&self, user_id: &ObjectId, order: &Order) -> Result<bool, StoreError>;

    /// Stores `address` in the `kind` slot only if that slot is empty.
    async fn fill_empty_address_slot(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError>;
    async fn set_address(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError>;
    async fn clear_addresses(&self, user_id: &ObjectId) -> Result<bool, StoreError>;
}

/// Creates a concrete store implementation based on the configured backend.
pub async fn create_store(backend: &StoreBackend) -> Result<Arc<dyn Store>, StoreError> {
    match backend {
        StoreBackend::MongoDB(mongo_config) => {
            let store = MongoDBStore::new(mongo_config).await?;
            info!("Successfully created MongoDB store.");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
