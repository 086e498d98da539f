//! Public user endpoints: signup, login and catalog browsing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::JsonBody;
use crate::error::AppError;
use crate::models::{Credentials, NewUser, Product, ProductView};
use crate::state::AppState;

/// Registers the public user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/productView", get(product_view))
        .route("/users/search", get(search))
}

#[derive(Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductView>,
    pub count: usize,
}

impl From<Vec<Product>> for ProductsResponse {
    fn from(products: Vec<Product>) -> Self {
        ProductsResponse {
            count: products.len(),
            products: products.iter().map(ProductView::from).collect(),
        }
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    name: Option<String>,
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let outcome = state.accounts.signup(new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: outcome.user_id.to_hex(),
            access_token: outcome.tokens.access_token,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let tokens = state.accounts.login(credentials).await?;
    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
    }))
}

async fn product_view(State(state): State<AppState>) -> Result<Json<ProductsResponse>, AppError> {
    Ok(Json(state.catalog.list_all().await?.into()))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ProductsResponse>, AppError> {
    let name = query.name.unwrap_or_default();
    Ok(Json(state.catalog.search_by_name(&name).await?.into()))
}
