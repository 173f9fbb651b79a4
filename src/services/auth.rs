//! Credential auth — salted password hashing and user lookup.
//!
//! TRADE-OFFS
//! ==========
//! Hashing is per-user-salted SHA-256. Registration relies on the unique
//! index on `username` rather than a read-then-write check, so two
//! concurrent registrations cannot both succeed.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::session::bytes_to_hex;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UnknownUser,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
}

pub(crate) fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Register a new user.
///
/// # Errors
///
/// `UserExists` when the username is taken; otherwise database errors.
pub async fn register(pool: &PgPool, username: &str, password: &str) -> Result<UserRow, AuthError> {
    let id = Uuid::new_v4();
    let salt = generate_salt();
    let hash = hash_password(&salt, password);

    let result = sqlx::query(
        "INSERT INTO users (id, username, password_hash, password_salt) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(username)
    .bind(&hash)
    .bind(&salt)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(UserRow { id, username: username.to_owned() }),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthError::UserExists),
        Err(e) => Err(e.into()),
    }
}

/// Verify credentials and return the user.
///
/// # Errors
///
/// `UnknownUser` for a missing username, `InvalidCredentials` for a wrong
/// password; otherwise database errors.
pub async fn login(pool: &PgPool, username: &str, password: &str) -> Result<UserRow, AuthError> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, password_salt FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::UnknownUser)?;

    let salt: String = row.get("password_salt");
    let stored: String = row.get("password_hash");
    if hash_password(&salt, password) != stored {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(UserRow { id: row.get("id"), username: row.get("username") })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
