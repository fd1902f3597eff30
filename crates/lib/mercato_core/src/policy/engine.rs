//! Enforcement engine construction.
//!
//! Builds the shared casbin enforcer over the relational adapter. Requests
//! take read locks to evaluate; administrative writes take the write lock so
//! the in-memory model and the stored rules move together.

use std::sync::Arc;

use casbin::{CoreApi, DefaultModel, Enforcer};
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::adapter::PolicyAdapter;

/// Model: subject/object/action/scope requests against role-linked rules.
///
/// Objects are route patterns (`/api/v1/users/{id}`), matched with
/// `keyMatch3`; actions are regex-matched HTTP methods; a rule scope of `*`
/// applies to every scope.
pub const DEFAULT_MODEL: &str = r#"
[request_definition]
r = sub, obj, act, dom

[policy_definition]
p = sub, obj, act, dom

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch3(r.obj, p.obj) && regexMatch(r.act, p.act) && (r.dom == p.dom || p.dom == "*")
"#;

/// The engine instance shared across requests.
pub type SharedEnforcer = Arc<RwLock<Enforcer>>;

/// Build an enforcer loaded with the rules currently stored in `pool`.
pub async fn build_enforcer(pool: PgPool) -> casbin::Result<Enforcer> {
    let model = DefaultModel::from_str(DEFAULT_MODEL).await?;
    let adapter = PolicyAdapter::new(pool);
    Enforcer::new(model, adapter).await
}

/// Wrap an enforcer for shared use.
pub fn share(enforcer: Enforcer) -> SharedEnforcer {
    Arc::new(RwLock::new(enforcer))
}
