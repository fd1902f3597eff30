//! # mercato_api
//!
//! HTTP API library for Mercato.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, policies};
use mercato_core::auth::clock::SystemClock;
use mercato_core::auth::roles::RoleCatalog;
use mercato_core::auth::token::{TokenCodec, TokenError};
use mercato_core::auth::verifier::TokenVerifier;
use mercato_core::policy::engine::SharedEnforcer;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Access token verifier (and issuer, through its codec).
    pub verifier: TokenVerifier,
    /// Role allow-list.
    pub catalog: RoleCatalog,
    /// Shared enforcement engine.
    pub enforcer: SharedEnforcer,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// Fails when the configured token algorithm is not registered — a
    /// misconfigured server never starts.
    pub fn build(
        pool: PgPool,
        config: ApiConfig,
        enforcer: SharedEnforcer,
    ) -> Result<Self, TokenError> {
        let codec = TokenCodec::new(config.auth_secret.as_bytes(), &config.token_algorithm)?;
        let verifier = TokenVerifier::new(codec, Arc::new(SystemClock));
        let catalog = RoleCatalog::new(&config.allowed_roles, &config.default_role);
        Ok(Self {
            pool,
            config,
            verifier,
            catalog,
            enforcer,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `mercato_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    mercato_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/v1/auth/login", post(auth::login_handler))
        .route("/api/v1/auth/register", post(auth::register_handler))
        .route("/api/v1/auth/refresh", post(auth::refresh_handler))
        .route("/api/v1/auth/logout", post(auth::logout_handler))
        .route("/api/v1/auth/status", get(auth::auth_status_handler));

    // Admin routes: the enforcement gateway runs first (it owns the OPTIONS
    // short-circuit and subject resolution), then bearer verification for
    // handler-level identity.
    let admin = Router::new()
        .route(
            "/api/v1/policies",
            get(policies::list_policies_handler)
                .post(policies::add_policy_handler)
                .delete(policies::remove_policy_handler),
        )
        .route(
            "/api/v1/users/{user_id}/roles",
            post(policies::grant_role_handler),
        )
        .route(
            "/api/v1/users/{user_id}/roles/{role}",
            delete(policies::revoke_role_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::enforce::enforce_policy,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}
