//! Authentication and authorization logic.
//!
//! Provides the signed-token codec, token verification, the role catalog,
//! password hashing, and the database queries shared across the API layer.

pub mod clock;
pub mod password;
pub mod queries;
pub mod roles;
pub mod token;
pub mod verifier;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Role not allowed: {0}")]
    RoleNotAllowed(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
