//! Cart and order endpoints. Mounted behind the bearer-token gate.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::{authorized_user, idempotency_key, parse_id, UserQuery};
use super::MessageResponse;
use crate::auth::AuthClaims;
use crate::error::AppError;
use crate::models::{LineItemView, OrderView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/addtocart", put(add_to_cart))
        .route("/removeitem", put(remove_item))
        .route("/listcart", get(list_cart))
        .route("/cartcheckout", post(checkout))
        .route("/instantbuy", post(instant_buy))
}

#[derive(Serialize, Deserialize)]
pub struct CartResponse {
    pub items: Vec<LineItemView>,
    pub total: i64,
}

#[derive(Serialize, Deserialize)]
pub struct OrderResponse {
    pub message: String,
    pub order: OrderView,
}

async fn add_to_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let product_id = parse_id("product_id", query.product_id.as_deref())?;
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    state.carts.add_to_cart(&user_id, &product_id).await?;
    Ok(MessageResponse::json("successfully added to the cart"))
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let product_id = parse_id("product_id", query.product_id.as_deref())?;
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    state.carts.remove_from_cart(&user_id, &product_id).await?;
    Ok(MessageResponse::json("successfully removed item from cart"))
}

async fn list_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CartResponse>, AppError> {
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    let summary = state.carts.list_cart(&user_id).await?;
    Ok(Json(CartResponse {
        items: summary.items.iter().map(LineItemView::from).collect(),
        total: summary.total,
    }))
}

async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
    headers: HeaderMap,
) -> Result<Json<OrderResponse>, AppError> {
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    let order = state
        .carts
        .checkout(&user_id, idempotency_key(&headers))
        .await?;
    Ok(Json(OrderResponse {
        message: "successfully placed the order".to_string(),
        order: OrderView::from(&order),
    }))
}

async fn instant_buy(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<OrderResponse>, AppError> {
    let product_id = parse_id("product_id", query.product_id.as_deref())?;
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    let order = state.carts.instant_buy(&user_id, &product_id).await?;
    Ok(Json(OrderResponse {
        message: "successfully placed the order".to_string(),
        order: OrderView::from(&order),
    }))
}
