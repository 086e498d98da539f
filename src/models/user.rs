use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{AddressBook, LineItem, Order};
use crate::error::AppError;

/// A storefront customer, stored in the `users` collection.
///
/// Cart, addresses and orders are embedded so that every mutation of a
/// customer's state is a single-document update.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub first_name: String,
    pub last_name: String,
    /// Always stored lower-cased; see [`normalize_email`].
    pub email: String,
    pub phone: String,
    /// bcrypt digest, never the plaintext.
    pub password: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_cart: Vec<LineItem>,
    #[serde(default)]
    pub addresses: AddressBook,
    #[serde(default)]
    pub orders: Vec<Order>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Body of `POST /users/signup`.
#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("first_name", &self.first_name, 2, 30)?;
        check_length("last_name", &self.last_name, 2, 30)?;
        if self.password.chars().count() < 6 {
            return Err(AppError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }
        if !looks_like_email(self.email.trim()) {
            return Err(AppError::Validation("email is not valid".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation("phone is required".into()));
        }
        Ok(())
    }

    /// Builds the user document. `password_hash` replaces the plaintext.
    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> User {
        User {
            id: ObjectId::new(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self.phone.trim().to_string(),
            password: password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
            user_cart: Vec::new(),
            addresses: AddressBook::default(),
            orders: Vec::new(),
        }
    }
}

/// Body of `POST /users/login`.
#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
