//! Error types shared by the store, services and HTTP handlers.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::tokens::TokenError;
use crate::utils::http_helpers::HTTPError;

/// Failures raised by a `Store` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// A unique constraint was violated. Carries the offending field.
    #[error("duplicate value for '{0}'")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Application-level error returned by services and converted into HTTP
/// responses by the handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyCart => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable, machine-readable code placed in the `error` field of responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::EmptyCart => "cart_empty",
            AppError::Auth(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Store(StoreError::Timeout(_)) => "store_timeout",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => AppError::Internal(err.to_string()),
            _ => AppError::Auth(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        // Backend details stay in the logs.
        let message = match &self {
            AppError::Store(StoreError::Timeout(_)) => "the store did not respond in time".to_string(),
            AppError::Store(_) | AppError::Internal(_) => {
                "something went wrong, please try again later".to_string()
            }
            other => other.to_string(),
        };

        HTTPError::new(status, self.code(), message).into_response()
    }
}

/// Raised while loading configuration; the process refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("jwt.secret must be set (config.yaml, STOREFRONT_JWT__SECRET or SECRET_KEY)")]
    MissingSecret,

    #[error("store.uri must be set for the mongo backend (config.yaml or MONGODB_URI)")]
    MissingStoreUri,
}
