//! Authentication middleware — Bearer token extraction and verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;
use mercato_core::models::auth::Identity;

/// Key used to store the verified [`Identity`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it,
/// and injects [`AuthenticatedUser`] into request extensions.
///
/// Every verification failure maps to the same 401 body; the variant is only
/// logged, so callers cannot probe whether a token was expired or forged.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let identity = state.verifier.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "token verification failed");
        AppError::Unauthorized("Authentication failed".into())
    })?;

    request.extensions_mut().insert(AuthenticatedUser(identity));

    Ok(next.run(request).await)
}
