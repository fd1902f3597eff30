//! Token verification — codec plus expiry against an injected clock.

use std::sync::Arc;

use crate::auth::clock::Clock;
use crate::auth::token::{TokenCodec, TokenError};
use crate::models::auth::Identity;

/// Verifies signed tokens and resolves them to an [`Identity`].
///
/// Expiry uses strict not-after semantics: a token whose `exp` equals the
/// verification-time clock reading is already expired.
#[derive(Clone)]
pub struct TokenVerifier {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// The underlying codec, for token issuance.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Decode, check expiry, and build the verified identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.codec.decode(token)?;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(Identity::from_claims(&claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::models::auth::TokenClaims;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn verifier_at(now: i64) -> TokenVerifier {
        TokenVerifier::new(
            TokenCodec::new("k", "sha256").unwrap(),
            Arc::new(FixedClock(Utc.timestamp_opt(now, 0).unwrap())),
        )
    }

    fn token_expiring_at(exp: i64) -> String {
        let claims = TokenClaims {
            sub: "u1".into(),
            email: "u1@x.com".into(),
            roles: vec!["admin".into(), "admin".into(), "support".into()],
            iat: exp - 3600,
            exp,
            jti: None,
        };
        TokenCodec::new("k", "sha256")
            .unwrap()
            .encode(&claims)
            .unwrap()
    }

    #[test]
    fn expiry_is_strictly_not_after() {
        let now = 1_700_000_000;
        // exp == now is already expired
        assert!(matches!(
            verifier_at(now).verify(&token_expiring_at(now)),
            Err(TokenError::Expired)
        ));
        // exp == now + 1 is still valid
        assert!(verifier_at(now).verify(&token_expiring_at(now + 1)).is_ok());
    }

    #[test]
    fn identity_deduplicates_roles() {
        let now = 1_700_000_000;
        let identity = verifier_at(now)
            .verify(&token_expiring_at(now + 60))
            .unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.email, "u1@x.com");
        assert_eq!(identity.roles, vec!["admin", "support"]);
    }

    #[test]
    fn issue_then_verify_two_hours_later_fails() {
        let issued_at = 1_700_000_000;
        let token = token_expiring_at(issued_at + 3600);

        let identity = verifier_at(issued_at).verify(&token).unwrap();
        assert!(identity.roles.contains(&"admin".to_string()));

        // Two hours past issuance the one-hour token is expired.
        assert!(matches!(
            verifier_at(issued_at + 2 * 3600).verify(&token),
            Err(TokenError::Expired)
        ));
    }
}
