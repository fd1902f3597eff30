//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    AuthStatusResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest,
    RegisterRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /api/v1/auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(&state, &body.email, &body.password, body.name.as_deref()).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state, &body.refresh_token).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/logout` — revoke a refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<LogoutResponse>> {
    let resp = auth::logout(&state, body.refresh_token.as_deref()).await?;
    Ok(Json(resp))
}

/// `GET /api/v1/auth/status` — check whether an admin user has been created.
pub async fn auth_status_handler(
    State(state): State<AppState>,
) -> AppResult<Json<AuthStatusResponse>> {
    let resp = auth::admin_exists(&state).await?;
    Ok(Json(resp))
}
