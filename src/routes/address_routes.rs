//! Address book endpoints. Mounted behind the bearer-token gate.

use axum::extract::{Query, State};
use axum::routing::{delete, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::{authorized_user, JsonBody, UserQuery};
use super::MessageResponse;
use crate::auth::AuthClaims;
use crate::error::AppError;
use crate::models::{AddressFields, AddressKind, AddressView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/addaddress", post(add_address))
        .route("/edithomeaddress", put(edit_home_address))
        .route("/editworkaddress", put(edit_work_address))
        .route("/deleteaddresses", delete(delete_addresses))
}

#[derive(Serialize, Deserialize)]
pub struct AddressResponse {
    pub message: String,
    pub address: AddressView,
}

async fn add_address(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
    JsonBody(fields): JsonBody<AddressFields>,
) -> Result<Json<AddressResponse>, AppError> {
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    let address = state.addresses.add_address(&user_id, fields).await?;
    Ok(Json(AddressResponse {
        message: "successfully added the address".to_string(),
        address: AddressView::from(&address),
    }))
}

async fn edit_address(
    state: AppState,
    claims: AuthClaims,
    query: UserQuery,
    kind: AddressKind,
    fields: AddressFields,
) -> Result<Json<AddressResponse>, AppError> {
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    let address = state.addresses.edit_address(&user_id, kind, fields).await?;
    Ok(Json(AddressResponse {
        message: format!("successfully updated the {} address", kind.field()),
        address: AddressView::from(&address),
    }))
}

async fn edit_home_address(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
    JsonBody(fields): JsonBody<AddressFields>,
) -> Result<Json<AddressResponse>, AppError> {
    edit_address(state, claims, query, AddressKind::Home, fields).await
}

async fn edit_work_address(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
    JsonBody(fields): JsonBody<AddressFields>,
) -> Result<Json<AddressResponse>, AppError> {
    edit_address(state, claims, query, AddressKind::Work, fields).await
}

async fn delete_addresses(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = authorized_user(&claims, query.user_id.as_deref())?;
    state.addresses.clear_addresses(&user_id).await?;
    Ok(MessageResponse::json("successfully deleted the addresses"))
}
