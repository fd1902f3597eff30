//! API server configuration.

use mercato_core::auth::token::resolve_auth_secret;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Token signing secret.
    pub auth_secret: String,
    /// Token HMAC algorithm name (`sha256`, `sha384`, `sha512`).
    pub token_algorithm: String,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Enforcement scope applied when a request carries no `X-Scope` header.
    pub default_scope: String,
    /// Role allow-list.
    pub allowed_roles: Vec<String>,
    /// Role assigned when a user has none.
    pub default_role: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                | Default                                  |
    /// |-------------------------|------------------------------------------|
    /// | `BIND_ADDR`             | `127.0.0.1:3200`                         |
    /// | `DATABASE_URL`          | `postgres://localhost:5432/mercato`      |
    /// | `AUTH_SECRET`           | generated & persisted to file            |
    /// | `TOKEN_ALGORITHM`       | `sha256`                                 |
    /// | `ACCESS_TOKEN_TTL_SECS` | `900`                                    |
    /// | `DEFAULT_SCOPE`         | `global`                                 |
    /// | `ALLOWED_ROLES`         | `admin,moderator,user`                   |
    /// | `DEFAULT_ROLE`          | `user`                                   |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3200".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/mercato".into()),
            auth_secret: resolve_auth_secret(),
            token_algorithm: std::env::var("TOKEN_ALGORITHM").unwrap_or_else(|_| "sha256".into()),
            access_token_ttl_secs: std::env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            default_scope: std::env::var("DEFAULT_SCOPE").unwrap_or_else(|_| "global".into()),
            allowed_roles: std::env::var("ALLOWED_ROLES")
                .unwrap_or_else(|_| "admin,moderator,user".into())
                .split(',')
                .map(str::to_string)
                .collect(),
            default_role: std::env::var("DEFAULT_ROLE").unwrap_or_else(|_| "user".into()),
        }
    }
}
