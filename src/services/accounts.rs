//! Signup and login.

use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tracing::{info, warn};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{TokenPair, TokenService};
use crate::error::{AppError, StoreError};
use crate::models::{normalize_email, Credentials, NewUser};
use crate::store::Database;

const BAD_CREDENTIALS: &str = "login or password is incorrect";

#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub user_id: ObjectId,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(db: Database, tokens: Arc<TokenService>) -> Self {
        AccountService { db, tokens }
    }

    /// Registers a new user and issues its first token pair. Email (compared
    /// case-insensitively) and phone must both be unused.
    pub async fn signup(&self, new_user: NewUser) -> Result<SignupOutcome, AppError> {
        new_user.validate()?;

        let digest = hash_password_blocking(new_user.password.clone()).await?;
        let mut user = new_user.into_user(digest, Utc::now());
        let tokens = self
            .tokens
            .issue(&user.id, &user.email, &user.first_name, &user.last_name)?;
        user.refresh_token = Some(tokens.refresh_token.clone());

        let inserted = self
            .db
            .run("insert_user", self.db.store().insert_user(&user))
            .await;
        match inserted {
            Ok(()) => {}
            Err(StoreError::Duplicate(field)) if field == "phone" => {
                return Err(AppError::Conflict("phone number already in use".into()));
            }
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict("user already exists".into()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "User signed up");
        Ok(SignupOutcome {
            user_id: user.id,
            tokens,
        })
    }

    /// Checks credentials, issues a fresh token pair and records the new
    /// refresh token, superseding the previous one.
    pub async fn login(&self, credentials: Credentials) -> Result<TokenPair, AppError> {
        let email = normalize_email(&credentials.email);
        let user = self
            .db
            .run("find_user_by_email", self.db.store().find_user_by_email(&email))
            .await?;

        let Some(user) = user else {
            warn!("Login attempt for unknown email");
            return Err(AppError::Auth(BAD_CREDENTIALS.into()));
        };

        if !verify_password_blocking(user.password.clone(), credentials.password).await? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AppError::Auth(BAD_CREDENTIALS.into()));
        }

        let tokens = self
            .tokens
            .issue(&user.id, &user.email, &user.first_name, &user.last_name)?;
        self.tokens
            .persist_refresh(&user.id, &tokens.refresh_token)
            .await?;

        info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JWTConfig;
    use crate::services::test_support::memory_database;

    fn service() -> AccountService {
        let db = memory_database();
        let tokens = Arc::new(TokenService::new(
            &JWTConfig {
                secret: "secretkey".into(),
                access_ttl_hours: 24,
                refresh_ttl_hours: 168,
            },
            db.clone(),
        ));
        AccountService::new(db, tokens)
    }

    fn signup_body(email: &str, phone: &str) -> NewUser {
        NewUser {
            first_name: "Asha".into(),
            last_name: "Patil".into(),
            email: email.into(),
            phone: phone.into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn signup_stores_hash_and_refresh_token() {
        let accounts = service();
        let outcome = accounts
            .signup(signup_body("asha@example.com", "111"))
            .await
            .unwrap();

        let stored = accounts
            .db
            .store()
            .find_user(&outcome.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password, "secret1");
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(outcome.tokens.refresh_token.as_str())
        );
        let claims = accounts.tokens.validate(&outcome.tokens.access_token).unwrap();
        assert_eq!(claims.uid, outcome.user_id.to_hex());
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_in_any_case() {
        let accounts = service();
        accounts
            .signup(signup_body("asha@example.com", "111"))
            .await
            .unwrap();

        let err = accounts
            .signup(signup_body("ASHA@Example.com", "222"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "user already exists"));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_phone() {
        let accounts = service();
        accounts
            .signup(signup_body("asha@example.com", "111"))
            .await
            .unwrap();

        let err = accounts
            .signup(signup_body("other@example.com", "111"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "phone number already in use"));
    }

    #[tokio::test]
    async fn login_checks_password_and_rotates_refresh_token() {
        let accounts = service();
        let outcome = accounts
            .signup(signup_body("asha@example.com", "111"))
            .await
            .unwrap();

        let wrong = accounts
            .login(Credentials {
                email: "asha@example.com".into(),
                password: "secret2".into(),
            })
            .await;
        assert!(matches!(wrong, Err(AppError::Auth(_))));

        let unknown = accounts
            .login(Credentials {
                email: "nobody@example.com".into(),
                password: "secret1".into(),
            })
            .await;
        assert!(matches!(unknown, Err(AppError::Auth(_))));

        let pair = accounts
            .login(Credentials {
                email: "Asha@Example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        let stored = accounts
            .db
            .store()
            .find_user(&outcome.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_token, Some(pair.refresh_token));
    }
}
