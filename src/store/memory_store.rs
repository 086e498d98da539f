use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use super::Store;
use crate::error::StoreError;
use crate::models::{Address, AddressBook, AddressKind, LineItem, Order, Product, User};

#[derive(Default)]
struct Collections {
    users: HashMap<ObjectId, User>,
    /// Kept in insertion order so listings are stable.
    products: Vec<Product>,
}

/// A process-local store. Each method holds the lock for its whole body,
/// which gives the same per-document atomicity as the MongoDB backend.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Applies `update` to the user with `user_id`. Returns `false` when there
    /// is no such user.
    fn update_user<F>(&self, user_id: &ObjectId, update: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut User),
    {
        let mut collections = self.lock()?;
        match collections.users.get_mut(user_id) {
            Some(user) => {
                update(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        if collections.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate("_id".to_string()));
        }
        for existing in collections.users.values() {
            if existing.email == user.email {
                return Err(StoreError::Duplicate("email".to_string()));
            }
            if existing.phone == user.phone {
                return Err(StoreError::Duplicate("phone".to_string()));
            }
        }
        collections.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn set_refresh_token(
        &self,
        user_id: &ObjectId,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            user.refresh_token = Some(refresh_token.to_string());
            user.updated_at = now;
        })
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        if collections.products.iter().any(|p| p.id == product.id) {
            return Err(StoreError::Duplicate("_id".to_string()));
        }
        collections.products.push(product.clone());
        Ok(())
    }

    async fn find_product(&self, product_id: &ObjectId) -> Result<Option<Product>, StoreError> {
        Ok(self
            .lock()?
            .products
            .iter()
            .find(|p| &p.id == product_id)
            .cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.lock()?.products.clone())
    }

    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, StoreError> {
        let needle = needle.to_lowercase();
        Ok(self
            .lock()?
            .products
            .iter()
            .filter(|p| p.product_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn push_cart_item(
        &self,
        user_id: &ObjectId,
        item: &LineItem,
    ) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            user.user_cart.push(item.clone());
            user.updated_at = Utc::now();
        })
    }

    async fn pull_cart_items(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            user.user_cart.retain(|item| &item.product_id != product_id);
            user.updated_at = Utc::now();
        })
    }

    async fn commit_checkout(
        &self,
        user_id: &ObjectId,
        expected_cart: &[LineItem],
        order: &Order,
    ) -> Result<bool, StoreError> {
        let mut collections = self.lock()?;
        let Some(user) = collections.users.get_mut(user_id) else {
            return Ok(false);
        };
        if user.user_cart.as_slice() != expected_cart {
            return Ok(false);
        }
        if let Some(key) = &order.idempotency_key {
            if user
                .orders
                .iter()
                .any(|o| o.idempotency_key.as_ref() == Some(key))
            {
                return Ok(false);
            }
        }
        user.orders.push(order.clone());
        user.user_cart.clear();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn push_order(&self, user_id: &ObjectId, order: &Order) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            user.orders.push(order.clone());
            user.updated_at = Utc::now();
        })
    }

    async fn fill_empty_address_slot(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError> {
        let mut collections = self.lock()?;
        let Some(user) = collections.users.get_mut(user_id) else {
            return Ok(false);
        };
        let slot = user.addresses.slot_mut(kind);
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(address.clone());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_address(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        address: &Address,
    ) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            *user.addresses.slot_mut(kind) = Some(address.clone());
            user.updated_at = Utc::now();
        })
    }

    async fn clear_addresses(&self, user_id: &ObjectId) -> Result<bool, StoreError> {
        self.update_user(user_id, |user| {
            user.addresses = AddressBook::default();
            user.updated_at = Utc::now();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn user(email: &str, phone: &str) -> User {
        NewUser {
            first_name: "Asha".into(),
            last_name: "Patil".into(),
            email: email.into(),
            phone: phone.into(),
            password: "secret1".into(),
        }
        .into_user("digest".into(), Utc::now())
    }

    fn product(name: &str, price: i64) -> Product {
        Product {
            id: ObjectId::new(),
            product_name: name.to_string(),
            price,
            rating: 3,
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_phone() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@example.com", "1")).await.unwrap();

        match store.insert_user(&user("A@Example.com", "2")).await {
            Err(StoreError::Duplicate(field)) => assert_eq!(field, "email"),
            other => panic!("expected duplicate email, got {:?}", other.map(|_| ())),
        }
        match store.insert_user(&user("b@example.com", "1")).await {
            Err(StoreError::Duplicate(field)) => assert_eq!(field, "phone"),
            other => panic!("expected duplicate phone, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_product_id() {
        let store = MemoryStore::new();
        let kettle = product("Kettle", 30);
        store.insert_product(&kettle).await.unwrap();
        assert!(matches!(
            store.insert_product(&kettle).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn searches_names_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_product(&product("Steel Kettle", 30)).await.unwrap();
        store.insert_product(&product("Teapot", 12)).await.unwrap();

        let found = store.search_products("KETT").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_name, "Steel Kettle");
        assert!(store.search_products("mug").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_commit_requires_unchanged_cart() {
        let store = MemoryStore::new();
        let buyer = user("a@example.com", "1");
        store.insert_user(&buyer).await.unwrap();
        let item = LineItem::from(&product("Kettle", 30));
        store.push_cart_item(&buyer.id, &item).await.unwrap();

        let stale = Order::cash_on_delivery(vec![], None, Utc::now()).unwrap();
        assert!(!store.commit_checkout(&buyer.id, &[], &stale).await.unwrap());

        let order = Order::cash_on_delivery(vec![item.clone()], None, Utc::now()).unwrap();
        assert!(store
            .commit_checkout(&buyer.id, &[item], &order)
            .await
            .unwrap());

        let stored = store.find_user(&buyer.id).await.unwrap().unwrap();
        assert!(stored.user_cart.is_empty());
        assert_eq!(stored.orders, vec![order]);
    }

    #[tokio::test]
    async fn updates_report_missing_user() {
        let store = MemoryStore::new();
        let missing = ObjectId::new();
        let item = LineItem::from(&product("Kettle", 30));
        assert!(!store.push_cart_item(&missing, &item).await.unwrap());
        assert!(!store.clear_addresses(&missing).await.unwrap());
        assert!(!store
            .set_refresh_token(&missing, "t", Utc::now())
            .await
            .unwrap());
    }
}
