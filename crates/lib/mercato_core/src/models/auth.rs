//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API's request/response
//! DTOs (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};

/// Domain user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Refresh token record stored in the database.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Claims embedded in a signed access token.
///
/// Field order is the canonical wire order; the codec signs the payload
/// exactly as serialized here. `iat`/`exp` are required — a payload missing
/// either fails decoding instead of defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Subject — user ID.
    pub sub: String,
    /// User email.
    pub email: String,
    /// User roles, in the order they were issued.
    pub roles: Vec<String>,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Token ID, omitted from the payload when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Principal resolved from a successfully verified token.
///
/// Only `TokenVerifier::verify` constructs one; untrusted input never
/// becomes an `Identity` directly.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    /// Deduplicated roles, first occurrence wins.
    pub roles: Vec<String>,
}

impl Identity {
    pub(crate) fn from_claims(claims: &TokenClaims) -> Self {
        let mut seen = std::collections::HashSet::new();
        let roles = claims
            .roles
            .iter()
            .filter(|role| seen.insert(role.as_str()))
            .cloned()
            .collect();
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            roles,
        }
    }
}
