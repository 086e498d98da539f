//! Catalog administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::JsonBody;
use crate::error::AppError;
use crate::models::NewProduct;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/addproduct", post(add_product))
}

#[derive(Serialize, Deserialize)]
pub struct AddProductResponse {
    pub product_id: String,
}

async fn add_product(
    State(state): State<AppState>,
    JsonBody(new_product): JsonBody<NewProduct>,
) -> Result<(StatusCode, Json<AddProductResponse>), AppError> {
    let product = state.catalog.insert(new_product).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddProductResponse {
            product_id: product.id.to_hex(),
        }),
    ))
}
