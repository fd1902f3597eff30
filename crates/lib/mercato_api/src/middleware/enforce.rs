//! Policy enforcement gateway.
//!
//! Per-request check against the shared enforcement engine: resolve
//! (subject, object, action, scope), ask the engine, pass or reject.
//! Synchronous and side-effect-free apart from invoking the next handler.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use casbin::CoreApi;

use crate::AppState;
use crate::error::AppError;

const SUBJECT_HEADER: &str = "x-subject";
const CLIENT_ID_HEADER: &str = "x-client-id";
const SCOPE_HEADER: &str = "x-scope";

/// Axum middleware: evaluate the request against the policy engine.
///
/// `OPTIONS` requests (CORS preflight) are answered directly before any
/// subject resolution. A request with no resolvable subject gets 401; a
/// denied one gets 403.
pub async fn enforce_policy(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.method() == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }

    let Some(subject) = resolve_subject(request.headers()) else {
        return Err(AppError::Unauthorized(
            "No subject identity in request".into(),
        ));
    };
    let scope = resolve_scope(request.headers(), &state.config.default_scope);
    // Rules are written against route patterns (`/api/v1/users/{id}`), so
    // prefer the matched pattern over the concrete path.
    let object = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let action = request.method().as_str().to_uppercase();

    let allowed = {
        let enforcer = state.enforcer.read().await;
        enforcer.enforce((subject.as_str(), object.as_str(), action.as_str(), scope.as_str()))?
    };

    if allowed {
        tracing::debug!(%subject, %object, %action, %scope, "policy allow");
        Ok(next.run(request).await)
    } else {
        tracing::debug!(%subject, %object, %action, %scope, "policy deny");
        Err(AppError::Forbidden("Access denied by policy".into()))
    }
}

/// Resolve the enforcement subject, first non-empty wins:
/// `X-Subject` → `X-Client-Id` → bearer token value → `anonymous`.
///
/// The bearer value is used verbatim as the subject — API-key-style callers
/// are enforced by their key, without signature verification in this path.
/// `anonymous` applies only when no `Authorization` header is present at
/// all; a present but non-bearer-shaped header resolves nothing.
fn resolve_subject(headers: &HeaderMap) -> Option<String> {
    if let Some(subject) = non_empty_header(headers, SUBJECT_HEADER) {
        return Some(subject);
    }
    if let Some(client_id) = non_empty_header(headers, CLIENT_ID_HEADER) {
        return Some(client_id);
    }
    match headers.get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string),
        None => Some("anonymous".to_string()),
    }
}

fn resolve_scope(headers: &HeaderMap, default_scope: &str) -> String {
    non_empty_header(headers, SCOPE_HEADER).unwrap_or_else(|| default_scope.to_string())
}

fn non_empty_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn explicit_subject_header_wins() {
        let map = headers(&[
            ("x-subject", "u1"),
            ("x-client-id", "svc-1"),
            ("authorization", "Bearer tok"),
        ]);
        assert_eq!(resolve_subject(&map), Some("u1".into()));
    }

    #[test]
    fn client_id_beats_bearer() {
        let map = headers(&[("x-client-id", "svc-1"), ("authorization", "Bearer tok")]);
        assert_eq!(resolve_subject(&map), Some("svc-1".into()));
    }

    #[test]
    fn bearer_value_is_taken_verbatim() {
        let map = headers(&[("authorization", "Bearer api-key-123")]);
        assert_eq!(resolve_subject(&map), Some("api-key-123".into()));
    }

    #[test]
    fn empty_subject_header_falls_through() {
        let map = headers(&[("x-subject", ""), ("x-client-id", "svc-1")]);
        assert_eq!(resolve_subject(&map), Some("svc-1".into()));
    }

    #[test]
    fn no_headers_means_anonymous() {
        assert_eq!(resolve_subject(&HeaderMap::new()), Some("anonymous".into()));
    }

    #[test]
    fn non_bearer_authorization_resolves_nothing() {
        let map = headers(&[("authorization", "Basic dTE6cHc=")]);
        assert_eq!(resolve_subject(&map), None);
        let map = headers(&[("authorization", "Bearer ")]);
        assert_eq!(resolve_subject(&map), None);
    }

    #[test]
    fn scope_header_overrides_default() {
        let map = headers(&[("x-scope", "tenant-7")]);
        assert_eq!(resolve_scope(&map, "global"), "tenant-7");
        assert_eq!(resolve_scope(&HeaderMap::new(), "global"), "global");
    }
}
