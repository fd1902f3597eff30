//! Authentication service — login/register/refresh flows.

use chrono::{Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AuthStatusResponse, AuthUser, LogoutResponse, TokenResponse};
use mercato_core::auth::{password, queries};
use mercato_core::models::auth::TokenClaims;
use mercato_core::uuid::uuidv7;

/// Refresh token lifetime: 30 days.
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Refresh token generation & hashing
// ---------------------------------------------------------------------------

/// Generate a cryptographically random refresh token (64 alphanumeric chars).
fn generate_refresh_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a refresh token for storage.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Access token issuance
// ---------------------------------------------------------------------------

/// Issue a signed access token for the given user.
///
/// Roles are expected to be catalog-normalized by the caller; the claims
/// carry them in that order.
fn issue_access_token(
    state: &AppState,
    user_id: &str,
    email: &str,
    roles: &[String],
) -> AppResult<String> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
        iat: now.timestamp(),
        exp: now.timestamp() + state.config.access_token_ttl_secs,
        jti: Some(uuidv7().to_string()),
    };
    Ok(state.verifier.codec().encode(&claims)?)
}

/// Build a `TokenResponse` from user data plus a fresh token pair.
fn build_token_response(
    state: &AppState,
    user_id: &str,
    email: &str,
    name: Option<&str>,
    roles: &[String],
    access_token: String,
    refresh_token: String,
) -> TokenResponse {
    TokenResponse {
        access_token,
        refresh_token,
        expires_in: state.config.access_token_ttl_secs,
        token_type: "Bearer".to_string(),
        user: AuthUser {
            id: user_id.to_string(),
            email: email.to_string(),
            name: name.map(|n| n.to_string()),
            roles: roles.to_vec(),
        },
    }
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Authenticate with email + password.
pub async fn login(state: &AppState, email: &str, password_input: &str) -> AppResult<TokenResponse> {
    let row = queries::find_user_by_email(&state.pool, email).await?;

    let (user_id, name, pw_hash) = match row {
        // Generic error for wrong email
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
        Some(r) => r,
    };

    let pw_hash = match pw_hash {
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
        Some(h) => h,
    };

    // Generic error for wrong password
    if !password::verify_password(password_input, &pw_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let roles = state
        .catalog
        .normalize(&queries::get_user_roles(&state.pool, &user_id).await?);
    let access_token = issue_access_token(state, &user_id, email, &roles)?;
    let refresh_token = generate_refresh_token();
    let token_hash = hash_refresh_token(&refresh_token);

    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(&state.pool, &token_hash, &user_id, expires_at).await?;

    Ok(build_token_response(
        state,
        &user_id,
        email,
        name.as_deref(),
        &roles,
        access_token,
        refresh_token,
    ))
}

/// Register a new user account. First user gets the admin role.
pub async fn register(
    state: &AppState,
    email: &str,
    password_input: &str,
    name: Option<&str>,
) -> AppResult<TokenResponse> {
    if password_input.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Check duplicate email
    if queries::email_exists(&state.pool, email).await? {
        return Err(AppError::Validation("Email already registered".into()));
    }

    // Check if this is the first user
    let is_first_user = queries::user_count(&state.pool).await? == 0;

    let pw_hash = password::hash_password(password_input)?;

    let user_id = queries::create_user(&state.pool, email, name, &pw_hash).await?;

    let mut roles = Vec::new();
    if is_first_user {
        queries::grant_role(&state.pool, &user_id, "admin").await?;
        roles.push("admin".to_string());
        info!(email, "first user granted admin role");
    }
    let roles = state.catalog.normalize(&roles);

    let access_token = issue_access_token(state, &user_id, email, &roles)?;
    let refresh_token = generate_refresh_token();
    let token_hash = hash_refresh_token(&refresh_token);

    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(&state.pool, &token_hash, &user_id, expires_at).await?;

    Ok(build_token_response(
        state,
        &user_id,
        email,
        name,
        &roles,
        access_token,
        refresh_token,
    ))
}

/// Refresh an access token using a refresh token (single-use rotation).
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenResponse> {
    let token_hash = hash_refresh_token(refresh_token);

    // Find valid, non-revoked, non-expired token
    let row = queries::find_valid_refresh_token(&state.pool, &token_hash).await?;

    let (token_id, user_id) = match row {
        None => return Err(AppError::Unauthorized("Invalid refresh token".into())),
        Some(r) => r,
    };

    // Rotation: the presented token is spent
    queries::revoke_refresh_token(&state.pool, &token_id).await?;

    let user = queries::get_user_by_id(&state.pool, &user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let roles = state
        .catalog
        .normalize(&queries::get_user_roles(&state.pool, &user_id).await?);

    // Issue new token pair
    let access_token = issue_access_token(state, &user_id, &user.email, &roles)?;
    let new_refresh = generate_refresh_token();
    let new_hash = hash_refresh_token(&new_refresh);

    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(&state.pool, &new_hash, &user_id, expires_at).await?;

    Ok(build_token_response(
        state,
        &user_id,
        &user.email,
        user.name.as_deref(),
        &roles,
        access_token,
        new_refresh,
    ))
}

/// Logout — revoke a specific refresh token.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        let token_hash = hash_refresh_token(token);
        queries::revoke_refresh_token_by_hash(&state.pool, &token_hash).await?;
    }
    Ok(LogoutResponse { success: true })
}

/// Check whether an admin user exists (for first-run detection).
pub async fn admin_exists(state: &AppState) -> AppResult<AuthStatusResponse> {
    let exists = queries::admin_exists(&state.pool).await?;
    Ok(AuthStatusResponse {
        admin_exists: exists,
    })
}
