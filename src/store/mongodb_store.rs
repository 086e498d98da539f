use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{Address, AddressBook, AddressKind, LineItem, Order, Product, User};
use crate::store::Store;

const DUPLICATE_KEY: i32 = 11000;
const EMAIL_INDEX: &str = "email_unique";
const PHONE_INDEX: &str = "phone_unique";

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MongoDBConfig {
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "Ecommerce".to_string()
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// This struct holds references to two collections:
/// - `user_collection`: users with their embedded cart, addresses and orders
/// - `product_collection`: the catalog
pub struct MongoDBStore {
    user_collection: Collection<User>,
    product_collection: Collection<Product>,
}

impl MongoDBStore {
    /// Creates a new `MongoDBStore` from the given config.
    /// It initializes client connections, sets up indexes, etc.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB database '{}'", config.database);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to parse MongoDB URI: {}", e)))?;
        client_options.app_name = Some("storefront".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| StoreError::Backend(format!("Failed to create MongoDB client: {}", e)))?;

        let database = client.database(&config.database);
        let user_collection = database.collection::<User>("users");
        let product_collection = database.collection::<Product>("products");

        // Uniqueness of email and phone is enforced by the server, not by a
        // count-then-insert in the service. Products rely on `_id`.
        for (field, name) in [("email", EMAIL_INDEX), ("phone", PHONE_INDEX)] {
            let mut index = IndexModel::default();
            index.keys = doc! { field: 1 };
            index.options = Some(
                IndexOptions::builder()
                    .unique(true)
                    .name(name.to_string())
                    .build(),
            );
            user_collection
                .create_index(index, None)
                .await
                .map_err(|e| map_error(&format!("create index {}", name), e))?;
        }

        info!("MongoDB connection established successfully.");
        Ok(Self {
            user_collection,
            product_collection,
        })
    }

    async fn update_user(
        &self,
        operation: &str,
        filter: Document,
        update: Document,
    ) -> Result<bool, StoreError> {
        let result = self
            .user_collection
            .update_one(filter, update, None)
            .await
            .map_err(|e| map_error(operation, e))?;
        debug!(
            "{}: matched {} modified {}",
            operation, result.matched_count, result.modified_count
        );
        Ok(result.matched_count > 0)
    }
}

/// Maps driver errors, recognising duplicate-key violations by index name.
fn map_error(operation: &str, err: MongoError) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY {
            return StoreError::Duplicate(duplicate_field(&write_error.message).to_string());
        }
    }
    StoreError::Backend(format!("{} failed: {}", operation, err))
}

fn duplicate_field(message: &str) -> &'static str {
    if message.contains(EMAIL_INDEX) {
        "email"
    } else if message.contains(PHONE_INDEX) {
        "phone"
    } else {
        "_id"
    }
}

fn bson_of<T: Serialize>(value: &T) -> Result<Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Backend(format!("Failed to encode document: {}", e)))
}

/// Escapes regex metacharacters so the search term is matched literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Store for MongoDBStore {
    fn backend_name(&self) -> &str {
        "mongodb"
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.user_collection
            .insert_one(user, None)
            .await
            .map_err(|e| map_error("insert user", e))?;
        Ok(())
    }

    async fn find_user(&self, user_id: &ObjectId) -> Result<Option<User>, StoreError> {
        self.user_collection
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(|e| map_error("find user", e))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.user_collection
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(|e| map_error("find user by email", e))
    }

    async fn set_refresh_token(
        &self,
        user_id: &ObjectId,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.update_user(
            "set refresh token",
            doc! { "_id": user_id },
            doc! { "$set": { "refresh_token": refresh_token, "updated_at": bson_of(&now)? } },
        )
        .await
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.product_collection
            .insert_one(product, None)
            .await
            .map_err(|e| map_error("insert product", e))?;
        Ok(())
    }

    async fn find_product(&self, product_id: &ObjectId) -> Result<Option<Product>, StoreError> {
        self.product_collection
            .find_one(doc! { "_id": product_id }, None)
            .await
            .map_err(|e| map_error("find product", e))
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let cursor = self
            .product_collection
            .find(doc! {}, None)
            .await
            .map_err(|e| map_error("list products", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| map_error("read products", e))
    }

    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, StoreError> {
        let filter = doc! {
            "product_name": { "$regex": escape_regex(needle), "$options": "i" }
        };
        let cursor = self
            .product_collection
            .find(filter, None)
            .await
            .map_err(|e| map_error("search products", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| map_error("read products", e))
    }

    async fn push_cart_item(
        &self,
        user_id: &ObjectId,
        item: &LineItem,
    ) -> Result<bool, StoreError> {
        self.update_user(
            "push cart item",
            doc! { "_id": user_id },
            doc! {
                "$push": { "user_cart": bson_of(item)? },
                "$set": { "updated_at": bson_of(&Utc::now())? },
            },
        )
        .await
    }

    async fn pull_cart_items(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<bool, StoreError> {
        self.update_user(
            "pull cart items",
            doc! { "_id": user_id },
            doc! {
                "$pull": { "user_cart": { "product_id": product_id } },
                "$set": { "updated_at": bson_of(&Utc::now())? },
            },
        )
        .await
    }

    async fn commit_checkout(
        &self,
        user_id: &ObjectId,
        expected_cart: &[LineItem],
        order: &Order,
    ) -> Result<bool, StoreError> {
        let mut filter = doc! {
            "_id": user_id,
            "user_cart": bson_of(&expected_cart)?,
        };
        if let Some(key) = &order.idempotency_key {
            filter.insert("orders.idempotency_key", doc! { "$ne": key.clone() });
        }
        self.update_user(
            "commit checkout",
            filter,
            doc! {
                "$push": { "orders": bson_of(order)? },
                "$set": {
                    "user_cart": Bson::Array(Vec::new()),
                    "updated_at": bson_of(&Utc::now())?,
                },
            },
        )
        .await
    }

    async fn push_order(&self, user_id: &ObjectId, order: &Order) -> Result<bool, StoreError> {
        self.update_user(
            "push order",
            doc! { "_id": user_id },
            doc! {
                "$push": { "orders": bson_of(order)? },
                "$set": { "updated_at": bson_of(&Utc::now())? },
            },
        )
        .await
    }

    async fn fill_empty_address_slot(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError> {
        let slot = format!("addresses.{}", kind.field());
        let mut filter = doc! { "_id": user_id };
        // Matches both an explicit null and a missing slot.
        filter.insert(slot.clone(), Bson::Null);
        let mut set = doc! { "updated_at": bson_of(&Utc::now())? };
        set.insert(slot, bson_of(address)?);
        self.update_user("fill address slot", filter, doc! { "$set": set })
            .await
    }

    async fn set_address(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError> {
        let mut set = doc! { "updated_at": bson_of(&Utc::now())? };
        set.insert(format!("addresses.{}", kind.field()), bson_of(address)?);
        self.update_user("set address", doc! { "_id": user_id }, doc! { "$set": set })
            .await
    }

    async fn clear_addresses(&self, user_id: &ObjectId) -> Result<bool, StoreError> {
        self.update_user(
            "clear addresses",
            doc! { "_id": user_id },
            doc! {
                "$set": {
                    "addresses": bson_of(&AddressBook::default())?,
                    "updated_at": bson_of(&Utc::now())?,
                },
            },
        )
        .await
    }
}
