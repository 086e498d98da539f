//! Cart manipulation, checkout and instant purchase.

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{total_price, LineItem, Order, Product, User};
use crate::store::Database;

/// The current cart of a user together with its summed price.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub items: Vec<LineItem>,
    pub total: i64,
}

#[derive(Clone)]
pub struct CartService {
    db: Database,
}

impl CartService {
    pub fn new(db: Database) -> Self {
        CartService { db }
    }

    async fn product(&self, product_id: &ObjectId) -> Result<Product, AppError> {
        self.db
            .run("find_product", self.db.store().find_product(product_id))
            .await?
            .ok_or(AppError::NotFound("product"))
    }

    async fn user(&self, user_id: &ObjectId) -> Result<User, AppError> {
        self.db
            .run("find_user", self.db.store().find_user(user_id))
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    /// Appends a snapshot of the product to the cart. Adding the same product
    /// twice yields two cart entries.
    pub async fn add_to_cart(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<(), AppError> {
        let item = LineItem::from(&self.product(product_id).await?);
        let matched = self
            .db
            .run("push_cart_item", self.db.store().push_cart_item(user_id, &item))
            .await?;
        if !matched {
            return Err(AppError::NotFound("user"));
        }
        info!(user_id = %user_id, product_id = %product_id, "Added item to cart");
        Ok(())
    }

    /// Removes every cart entry for the product. Removing a product that is
    /// not in the cart is not an error.
    pub async fn remove_from_cart(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<(), AppError> {
        let matched = self
            .db
            .run(
                "pull_cart_items",
                self.db.store().pull_cart_items(user_id, product_id),
            )
            .await?;
        if !matched {
            return Err(AppError::NotFound("user"));
        }
        info!(user_id = %user_id, product_id = %product_id, "Removed item from cart");
        Ok(())
    }

    pub async fn list_cart(&self, user_id: &ObjectId) -> Result<CartSummary, AppError> {
        let items = self.user(user_id).await?.user_cart;
        Ok(CartSummary {
            total: total_price(&items)?,
            items,
        })
    }

    pub async fn cart_total(&self, user_id: &ObjectId) -> Result<i64, AppError> {
        Ok(self.list_cart(user_id).await?.total)
    }

    /// Turns the cart into a cash-on-delivery order and empties the cart in a
    /// single conditional update. If the cart changes between the read and
    /// the update, nothing is written and the caller gets a conflict.
    ///
    /// With an `idempotency_key`, a repeated request returns the order that
    /// the first request created instead of placing another one.
    pub async fn checkout(
        &self,
        user_id: &ObjectId,
        idempotency_key: Option<String>,
    ) -> Result<Order, AppError> {
        let user = self.user(user_id).await?;
        if let Some(existing) = order_with_key(&user, idempotency_key.as_deref()) {
            info!(user_id = %user_id, order_id = %existing.order_id, "Replaying checkout");
            return Ok(existing);
        }
        if user.user_cart.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let order = Order::cash_on_delivery(user.user_cart.clone(), idempotency_key, Utc::now())?;
        let committed = self
            .db
            .run(
                "commit_checkout",
                self.db
                    .store()
                    .commit_checkout(user_id, &user.user_cart, &order),
            )
            .await?;

        if committed {
            info!(
                user_id = %user_id,
                order_id = %order.order_id,
                price = order.price,
                "Checked out cart"
            );
            return Ok(order);
        }

        // A concurrent request with the same key may have won the race.
        let current = self.user(user_id).await?;
        if let Some(existing) = order_with_key(&current, order.idempotency_key.as_deref()) {
            return Ok(existing);
        }
        warn!(user_id = %user_id, "Cart changed during checkout");
        Err(AppError::Conflict("cart changed during checkout".into()))
    }

    /// Places a single-item order for the product without touching the cart.
    pub async fn instant_buy(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
    ) -> Result<Order, AppError> {
        let item = LineItem::from(&self.product(product_id).await?);
        let order = Order::cash_on_delivery(vec![item], None, Utc::now())?;
        let matched = self
            .db
            .run("push_order", self.db.store().push_order(user_id, &order))
            .await?;
        if !matched {
            return Err(AppError::NotFound("user"));
        }
        info!(user_id = %user_id, order_id = %order.order_id, "Instant buy");
        Ok(order)
    }
}

fn order_with_key(user: &User, key: Option<&str>) -> Option<Order> {
    let key = key?;
    user.orders
        .iter()
        .find(|order| order.idempotency_key.as_deref() == Some(key))
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::DateTime;

    use super::*;
    use crate::error::StoreError;
    use crate::metrics::Metrics;
    use crate::models::{Address, AddressKind, PaymentMethod};
    use crate::services::test_support::{memory_database, seed_product, seed_user};
    use crate::store::memory_store::MemoryStore;
    use crate::store::Store;

    #[tokio::test]
    async fn checkout_moves_cart_into_a_cod_order() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;
        let y = seed_product(&db, "Y", 15).await;

        carts.add_to_cart(&user.id, &x.id).await.unwrap();
        carts.add_to_cart(&user.id, &y.id).await.unwrap();
        assert_eq!(carts.cart_total(&user.id).await.unwrap(), 25);

        let order = carts.checkout(&user.id, None).await.unwrap();
        assert_eq!(order.price, 25);
        assert_eq!(order.order_list.len(), 2);
        assert_eq!(order.payment_method, PaymentMethod::CASH_ON_DELIVERY);

        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert!(stored.user_cart.is_empty());
        assert_eq!(stored.orders, vec![order]);
        assert_eq!(carts.cart_total(&user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_checked_out() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;

        assert!(matches!(
            carts.checkout(&user.id, None).await,
            Err(AppError::EmptyCart)
        ));
        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert!(stored.orders.is_empty());
    }

    #[tokio::test]
    async fn repeated_checkout_with_same_key_places_one_order() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;
        carts.add_to_cart(&user.id, &x.id).await.unwrap();

        let first = carts
            .checkout(&user.id, Some("key-1".into()))
            .await
            .unwrap();
        let second = carts
            .checkout(&user.id, Some("key-1".into()))
            .await
            .unwrap();
        assert_eq!(first.order_id, second.order_id);

        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.orders.len(), 1);
    }

    #[tokio::test]
    async fn removing_a_product_drops_all_its_entries() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;
        let y = seed_product(&db, "Y", 15).await;
        carts.add_to_cart(&user.id, &x.id).await.unwrap();
        carts.add_to_cart(&user.id, &x.id).await.unwrap();
        carts.add_to_cart(&user.id, &y.id).await.unwrap();

        carts.remove_from_cart(&user.id, &x.id).await.unwrap();
        let summary = carts.list_cart(&user.id).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.total, 15);

        // Not in the cart any more: still fine.
        carts.remove_from_cart(&user.id, &x.id).await.unwrap();
    }

    #[tokio::test]
    async fn instant_buy_leaves_cart_alone() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;
        let y = seed_product(&db, "Y", 15).await;
        carts.add_to_cart(&user.id, &x.id).await.unwrap();

        let order = carts.instant_buy(&user.id, &y.id).await.unwrap();
        assert_eq!(order.price, 15);
        assert_eq!(order.order_list.len(), 1);

        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.user_cart.len(), 1);
        assert_eq!(stored.orders.len(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;

        assert!(matches!(
            carts.add_to_cart(&user.id, &ObjectId::new()).await,
            Err(AppError::NotFound("product"))
        ));
        assert!(matches!(
            carts.add_to_cart(&ObjectId::new(), &x.id).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(
            carts.instant_buy(&ObjectId::new(), &x.id).await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn overflowing_cart_total_is_rejected() {
        let db = memory_database();
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let pricey = seed_product(&db, "Pricey", i64::MAX).await;

        carts.add_to_cart(&user.id, &pricey.id).await.unwrap();
        carts.add_to_cart(&user.id, &pricey.id).await.unwrap();

        assert!(matches!(
            carts.cart_total(&user.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            carts.checkout(&user.id, None).await,
            Err(AppError::Validation(_))
        ));
        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert!(stored.orders.is_empty());
        assert_eq!(stored.user_cart.len(), 2);
    }

    #[tokio::test]
    async fn cart_changed_before_commit_is_a_conflict() {
        let inner = Arc::new(MemoryStore::new());
        let db = Database::new(
            Arc::new(CartChangingStore {
                inner: inner.clone(),
            }),
            Duration::from_secs(5),
            Metrics::new(),
        );
        let carts = CartService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;
        let x = seed_product(&db, "X", 10).await;
        carts.add_to_cart(&user.id, &x.id).await.unwrap();

        assert!(matches!(
            carts.checkout(&user.id, None).await,
            Err(AppError::Conflict(ref m)) if m == "cart changed during checkout"
        ));
        let stored = inner.find_user(&user.id).await.unwrap().unwrap();
        assert!(stored.orders.is_empty());
        assert_eq!(stored.user_cart.len(), 2);
    }

    /// Memory store that appends to the cart right before every checkout
    /// commit, as a concurrent `add_to_cart` would.
    struct CartChangingStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl Store for CartChangingStore {
        fn backend_name(&self) -> &str {
            "cart-changing"
        }

        async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.insert_user(user).await
        }

        async fn find_user(&self, user_id: &ObjectId) -> Result<Option<User>, StoreError> {
            self.inner.find_user(user_id).await
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_email(email).await
        }

        async fn set_refresh_token(
            &self,
            user_id: &ObjectId,
            refresh_token: &str,
            now: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.inner.set_refresh_token(user_id, refresh_token, now).await
        }

        async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
            self.inner.insert_product(product).await
        }

        async fn find_product(
            &self,
            product_id: &ObjectId,
        ) -> Result<Option<Product>, StoreError> {
            self.inner.find_product(product_id).await
        }

        async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
            self.inner.list_products().await
        }

        async fn search_products(&self, needle: &str) -> Result<Vec<Product>, StoreError> {
            self.inner.search_products(needle).await
        }

        async fn push_cart_item(
            &self,
            user_id: &ObjectId,
            item: &LineItem,
        ) -> Result<bool, StoreError> {
            self.inner.push_cart_item(user_id, item).await
        }

        async fn pull_cart_items(
            &self,
            user_id: &ObjectId,
            product_id: &ObjectId,
        ) -> Result<bool, StoreError> {
            self.inner.pull_cart_items(user_id, product_id).await
        }

        async fn commit_checkout(
            &self,
            user_id: &ObjectId,
            expected_cart: &[LineItem],
            order: &Order,
        ) -> Result<bool, StoreError> {
            if let Some(item) = expected_cart.first() {
                self.inner.push_cart_item(user_id, item).await?;
            }
            self.inner
                .commit_checkout(user_id, expected_cart, order)
                .await
        }

        async fn push_order(&self, user_id: &ObjectId, order: &Order) -> Result<bool, StoreError> {
            self.inner.push_order(user_id, order).await
        }

        async fn fill_empty_address_slot(
            &self,
            user_id: &ObjectId,
            kind: AddressKind,
            address: &Address,
        ) -> Result<bool, StoreError> {
            self.inner
                .fill_empty_address_slot(user_id, kind, address)
                .await
        }

        async fn set_address(
            &self,
            user_id: &ObjectId,
            kind: AddressKind,
            address: &Address,
        ) -> Result<bool, StoreError> {
            self.inner.set_address(user_id, kind, address).await
        }

        async fn clear_addresses(&self, user_id: &ObjectId) -> Result<bool, StoreError> {
            self.inner.clear_addresses(user_id).await
        }
    }
}
