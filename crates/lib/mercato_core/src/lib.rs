//! # mercato_core
//!
//! Core domain logic for Mercato: authentication tokens, role catalog,
//! policy rule storage, and the policy engine adapter.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod policy;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
