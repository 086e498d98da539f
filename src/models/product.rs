use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A catalog entry. Stored in the `products` collection keyed by `_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub product_name: String,
    /// Whole currency units, never negative.
    pub price: i64,
    pub rating: u8,
    pub image: String,
}

/// Body of `POST /admin/addproduct`. The id is optional; a fresh one is
/// generated when absent.
#[derive(Deserialize, Debug, Clone)]
pub struct NewProduct {
    pub product_id: Option<String>,
    pub product_name: String,
    pub price: i64,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub image: String,
}

impl NewProduct {
    pub fn into_product(self) -> Result<Product, AppError> {
        let name = self.product_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("product_name is required".into()));
        }
        if self.price < 0 {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        let id = match self.product_id.as_deref() {
            Some(hex) => ObjectId::parse_str(hex)
                .map_err(|_| AppError::Validation("product_id is not a valid id".into()))?,
            None => ObjectId::new(),
        };

        Ok(Product {
            id,
            product_name: name.to_string(),
            price: self.price,
            rating: self.rating,
            image: self.image,
        })
    }
}

/// A denormalized snapshot of a product, embedded in carts and orders.
/// Later catalog changes never reach an existing line item.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ObjectId,
    pub product_name: String,
    pub price: i64,
    pub rating: u8,
    pub image: String,
}

impl From<&Product> for LineItem {
    fn from(product: &Product) -> Self {
        LineItem {
            product_id: product.id,
            product_name: product.product_name.clone(),
            price: product.price,
            rating: product.rating,
            image: product.image.clone(),
        }
    }
}

/// Sum of the prices of the given line items. Zero for an empty slice.
/// A sum that does not fit in an `i64` is rejected rather than wrapped.
pub fn total_price(items: &[LineItem]) -> Result<i64, AppError> {
    items
        .iter()
        .try_fold(0i64, |total, item| total.checked_add(item.price))
        .ok_or_else(|| AppError::Validation("cart total exceeds the supported amount".into()))
}

/// JSON shape of a product: ids are rendered as hex strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProductView {
    pub product_id: String,
    pub product_name: String,
    pub price: i64,
    pub rating: u8,
    pub image: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        ProductView {
            product_id: product.id.to_hex(),
            product_name: product.product_name.clone(),
            price: product.price,
            rating: product.rating,
            image: product.image.clone(),
        }
    }
}

pub type LineItemView = ProductView;

impl From<&LineItem> for ProductView {
    fn from(item: &LineItem) -> Self {
        ProductView {
            product_id: item.product_id.to_hex(),
            product_name: item.product_name.clone(),
            price: item.price,
            rating: item.rating,
            image: item.image.clone(),
        }
    }
}
