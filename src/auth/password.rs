//! Password hashing with bcrypt.

use crate::error::AppError;

/// bcrypt work factor used for every stored password.
pub const HASH_COST: u32 = 8;

/// Produces a salted bcrypt digest of `password`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Checks `candidate` against a stored digest. A malformed digest counts as a
/// mismatch.
pub fn verify_password(stored_digest: &str, candidate: &str) -> bool {
    bcrypt::verify(candidate, stored_digest).unwrap_or(false)
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(
    stored_digest: String,
    candidate: String,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&stored_digest, &candidate))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))
}
