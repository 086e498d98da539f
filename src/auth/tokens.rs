//! Issuing and validating HS256 access and refresh tokens.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::JWTConfig;
use crate::error::AppError;
use crate::store::Database;

/// Identity carried inside a signed token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthClaims {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Why a token was refused, or why one could not be produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("the token is invalid")]
    Invalid,

    #[error("token is expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs tokens with the server-wide secret and records the most recent
/// refresh token on the user document.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    db: Database,
}

impl TokenService {
    pub fn new(config: &JWTConfig, db: Database) -> Self {
        info!(
            "Creating token service (access ttl {}h, refresh ttl {}h)",
            config.access_ttl_hours, config.refresh_ttl_hours
        );
        TokenService {
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
            access_ttl: Duration::hours(config.access_ttl_hours),
            refresh_ttl: Duration::hours(config.refresh_ttl_hours),
            db,
        }
    }

    /// Issues an access/refresh token pair for the given identity.
    pub fn issue(
        &self,
        user_id: &ObjectId,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<TokenPair, TokenError> {
        self.issue_at(user_id, email, first_name, last_name, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &ObjectId,
        email: &str,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let claims = |ttl: Duration| AuthClaims {
            uid: user_id.to_hex(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(TokenPair {
            access_token: self.sign(&claims(self.access_ttl))?,
            refresh_token: self.sign(&claims(self.refresh_ttl))?,
        })
    }

    fn sign(&self, claims: &AuthClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies the signature and that the token has not yet expired.
    pub fn validate(&self, token: &str) -> Result<AuthClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Same as [`validate`](Self::validate) against an explicit clock.
    /// `exp` must be strictly after `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<AuthClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let claims = decode::<AuthClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Overwrites the user's stored refresh token. Fails with `NotFound`
    /// when no user has the given id.
    pub async fn persist_refresh(
        &self,
        user_id: &ObjectId,
        refresh_token: &str,
    ) -> Result<(), AppError> {
        let matched = self
            .db
            .run(
                "set_refresh_token",
                self.db
                    .store()
                    .set_refresh_token(user_id, refresh_token, Utc::now()),
            )
            .await?;

        if !matched {
            return Err(AppError::NotFound("user"));
        }
        debug!(user_id = %user_id, "Refresh token updated");
        Ok(())
    }
}
