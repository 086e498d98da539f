//! Product catalog: insertion, listing and name search.

use tracing::info;

use crate::error::{AppError, StoreError};
use crate::models::{NewProduct, Product};
use crate::store::Database;

#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Adds a product. A product whose id is already present is rejected by
    /// the store itself, so concurrent identical inserts cannot both succeed.
    pub async fn insert(&self, new_product: NewProduct) -> Result<Product, AppError> {
        let product = new_product.into_product()?;
        match self
            .db
            .run("insert_product", self.db.store().insert_product(&product))
            .await
        {
            Ok(()) => {
                info!(product_id = %product.id, "Product added to catalog");
                Ok(product)
            }
            Err(StoreError::Duplicate(_)) => {
                Err(AppError::Conflict("product already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, AppError> {
        Ok(self
            .db
            .run("list_products", self.db.store().list_products())
            .await?)
    }

    /// Case-insensitive substring search on the product name.
    pub async fn search_by_name(&self, query: &str) -> Result<Vec<Product>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("invalid search index".into()));
        }
        Ok(self
            .db
            .run("search_products", self.db.store().search_products(query))
            .await?)
    }
}
