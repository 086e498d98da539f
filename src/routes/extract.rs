//! Request extraction shared by the route modules.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use axum::Json;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::auth::AuthClaims;
use crate::error::AppError;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Like [`Json`], but malformed bodies are reported through [`AppError`] so
/// they share the JSON error shape of every other failure.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection_message(rejection))),
        }
    }
}

fn rejection_message(rejection: JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "expected a request with Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    }
}

/// Query string of the protected routes.
#[derive(Deserialize, Debug, Default)]
pub struct UserQuery {
    pub user_id: Option<String>,
    pub product_id: Option<String>,
}

/// Parses a hex object id taken from the query string.
pub fn parse_id(name: &str, value: Option<&str>) -> Result<ObjectId, AppError> {
    let value = value.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is empty", name)));
    }
    ObjectId::parse_str(value)
        .map_err(|_| AppError::Validation(format!("{} is not a valid id", name)))
}

/// Resolves the `user_id` a protected request acts on. It must belong to the
/// bearer of the token.
pub fn authorized_user(claims: &AuthClaims, user_id: Option<&str>) -> Result<ObjectId, AppError> {
    let id = parse_id("user_id", user_id)?;
    if id.to_hex() != claims.uid {
        return Err(AppError::Forbidden(
            "user_id does not match the authenticated user".into(),
        ));
    }
    Ok(id)
}

/// The client-supplied `Idempotency-Key` header, if any.
pub fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}
