use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::product::{total_price, LineItem, LineItemView};
use crate::error::AppError;

/// How an order is paid. Orders placed through this service are always
/// cash on delivery.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentMethod {
    pub digital: bool,
    pub cod: bool,
}

impl PaymentMethod {
    pub const CASH_ON_DELIVERY: PaymentMethod = PaymentMethod {
        digital: false,
        cod: true,
    };
}

/// An order record embedded in the user document. Never modified after
/// it has been written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: ObjectId,
    pub order_list: Vec<LineItem>,
    pub ordered_at: DateTime<Utc>,
    pub price: i64,
    pub discount: u8,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Order {
    /// Builds a cash-on-delivery order for the given items, priced at their sum.
    pub fn cash_on_delivery(
        items: Vec<LineItem>,
        idempotency_key: Option<String>,
        ordered_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(Order {
            order_id: ObjectId::new(),
            price: total_price(&items)?,
            order_list: items,
            ordered_at,
            discount: 0,
            payment_method: PaymentMethod::CASH_ON_DELIVERY,
            idempotency_key,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order_id: String,
    pub order_list: Vec<LineItemView>,
    pub ordered_at: DateTime<Utc>,
    pub price: i64,
    pub discount: u8,
    pub payment_method: PaymentMethod,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        OrderView {
            order_id: order.order_id.to_hex(),
            order_list: order.order_list.iter().map(LineItemView::from).collect(),
            ordered_at: order.ordered_at,
            price: order.price,
            discount: order.discount,
            payment_method: order.payment_method,
        }
    }
}
