//! API request/response models.
//!
//! Wire shapes for the JSON API (camelCase), distinct from the internal
//! domain models in `mercato_core::models`.

use serde::{Deserialize, Serialize};

/// Error body returned on every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always the literal `"error"`.
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub admin_exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// A policy rule as exposed by the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleDto {
    pub ptype: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyListResponse {
    pub rules: Vec<PolicyRuleDto>,
    /// The same rules rendered as policy lines, for display.
    pub lines: Vec<String>,
}

/// Result of a rule mutation; `changed` is false when the rule was already
/// present (add) or absent (remove).
#[derive(Debug, Clone, Serialize)]
pub struct PolicyChangeResponse {
    pub changed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<String>,
}
