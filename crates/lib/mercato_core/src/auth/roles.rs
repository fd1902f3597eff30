//! Role catalog — the single place role names are normalized and validated.
//!
//! Every role-consuming flow (login, registration, role grants) goes through
//! this catalog; normalizing ad hoc would let `"Admin"` and `"admin"` drift
//! apart in policy lookups.

use std::collections::BTreeSet;

use crate::auth::AuthError;

/// Configured role allow-list plus the fallback role.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    allowed: BTreeSet<String>,
    default_role: String,
}

impl RoleCatalog {
    /// Build a catalog. Names are lowercased and trimmed; the default role is
    /// always a member of the allow-list.
    pub fn new<I, S>(allowed: I, default_role: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: BTreeSet<String> = allowed
            .into_iter()
            .filter_map(|role| {
                let role = role.as_ref().trim().to_lowercase();
                (!role.is_empty()).then_some(role)
            })
            .collect();
        let default_role = default_role.trim().to_lowercase();
        allowed.insert(default_role.clone());
        Self {
            allowed,
            default_role,
        }
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub fn is_allowed(&self, role: &str) -> bool {
        self.allowed.contains(role)
    }

    /// Lowercase/trim, drop empties, deduplicate preserving first occurrence.
    /// An empty result falls back to `[default_role]` — never an empty set.
    pub fn normalize<S: AsRef<str>>(&self, roles: &[S]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut normalized: Vec<String> = roles
            .iter()
            .filter_map(|role| {
                let role = role.as_ref().trim().to_lowercase();
                (!role.is_empty() && seen.insert(role.clone())).then_some(role)
            })
            .collect();
        if normalized.is_empty() {
            normalized.push(self.default_role.clone());
        }
        normalized
    }

    /// Normalize, then fail on the first role outside the allow-list.
    pub fn assert_allowed<S: AsRef<str>>(&self, roles: &[S]) -> Result<Vec<String>, AuthError> {
        let normalized = self.normalize(roles);
        for role in &normalized {
            if !self.allowed.contains(role) {
                return Err(AuthError::RoleNotAllowed(role.clone()));
            }
        }
        Ok(normalized)
    }
}
