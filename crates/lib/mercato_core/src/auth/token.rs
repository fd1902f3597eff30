//! Signed access-token codec.
//!
//! Wire format: `base64url(JSON claims) + "." + base64url(HMAC(secret, payload))`.
//! The signature covers the payload segment exactly as emitted, so verification
//! recomputes over the transmitted string rather than re-encoded JSON.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::info;

use crate::models::auth::TokenClaims;

/// Token errors.
///
/// The HTTP boundary collapses all decode/verify variants into a single
/// generic 401; the variants exist for logging and tests.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token payload")]
    InvalidPayload,

    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

/// Registered HMAC hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parse an algorithm name. Unknown names are a construction-time
    /// configuration error, never a call-time one.
    pub fn parse(name: &str) -> Result<Self, TokenError> {
        match name.trim().to_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Stateless encoder/decoder for signed claims tokens.
///
/// Secret and algorithm are fixed at construction; instances are safe to
/// share across concurrent requests.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    algorithm: HashAlgorithm,
}

impl TokenCodec {
    /// Build a codec for the given secret and algorithm name.
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: &str) -> Result<Self, TokenError> {
        Ok(Self {
            secret: secret.into(),
            algorithm: HashAlgorithm::parse(algorithm)?,
        })
    }

    /// Encode claims into a signed token.
    ///
    /// Deterministic for identical claims, secret, and algorithm.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json =
            serde_json::to_vec(claims).map_err(|e| TokenError::EncodingFailed(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Decode a token, verifying its signature before parsing the payload.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [payload, signature] = segments.as_slice() else {
            return Err(TokenError::Malformed);
        };

        // Signature first: tampered input is rejected without ever reaching
        // the JSON parser, and the comparison is constant-time.
        let expected = self.sign(payload.as_bytes())?;
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;
        if !bool::from(expected.as_slice().ct_eq(&presented)) {
            return Err(TokenError::InvalidSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::InvalidPayload)?;
        serde_json::from_slice(&json).map_err(|_| TokenError::InvalidPayload)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        fn tag<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> Result<Vec<u8>, TokenError> {
            let mut mac = <M as Mac>::new_from_slice(secret)
                .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        match self.algorithm {
            HashAlgorithm::Sha256 => tag::<Hmac<Sha256>>(&self.secret, payload),
            HashAlgorithm::Sha384 => tag::<Hmac<Sha384>>(&self.secret, payload),
            HashAlgorithm::Sha512 => tag::<Hmac<Sha512>>(&self.secret, payload),
        }
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Resolve the token signing secret: env var `AUTH_SECRET` → persisted file.
pub fn resolve_auth_secret() -> String {
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = auth_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new auth secret");
    secret
}

/// Path to the persisted auth secret file.
fn auth_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mercato")
        .join("auth-secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            sub: "u1".into(),
            email: "u1@x.com".into(),
            roles: vec!["admin".into(), "support".into()],
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: Some("token-1".into()),
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new("k", "sha256").expect("sha256 is registered")
    }

    #[test]
    fn encode_decode_round_trip() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();
        assert_eq!(token.matches('.').count(), 1);
        assert_eq!(codec.decode(&token).unwrap(), claims());
    }

    #[test]
    fn round_trip_without_token_id() {
        let codec = codec();
        let claims = TokenClaims {
            jti: None,
            ..claims()
        };
        let token = codec.encode(&claims).unwrap();
        // jti is omitted from the payload entirely when absent
        let payload = URL_SAFE_NO_PAD
            .decode(token.split('.').next().unwrap())
            .unwrap();
        assert!(!String::from_utf8(payload).unwrap().contains("jti"));
        assert_eq!(codec.decode(&token).unwrap(), claims);
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = codec();
        assert_eq!(
            codec.encode(&claims()).unwrap(),
            codec.encode(&claims()).unwrap()
        );
    }

    #[test]
    fn flipped_signature_bit_is_rejected() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();
        let mut sig = URL_SAFE_NO_PAD.decode(signature).unwrap();
        for byte in 0..sig.len() {
            sig[byte] ^= 0x01;
            let tampered = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(&sig));
            assert!(matches!(
                codec.decode(&tampered),
                Err(TokenError::InvalidSignature)
            ));
            sig[byte] ^= 0x01;
        }
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = TokenClaims {
            roles: vec!["superadmin".into()],
            ..claims()
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        // Signature no longer matches, so this fails before JSON parsing.
        assert!(matches!(
            codec.decode(&format!("{forged_payload}.{signature}")),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let codec = codec();
        for token in ["", "abc", "a.b.c", "a.b.c.d"] {
            assert!(matches!(codec.decode(token), Err(TokenError::Malformed)));
        }
    }

    #[test]
    fn undecodable_payload_is_invalid() {
        let codec = codec();
        // Valid signature over a payload that is not base64url of JSON claims.
        for payload in ["!!not-base64!!", &URL_SAFE_NO_PAD.encode(b"[1,2,3]")] {
            let sig = codec.sign(payload.as_bytes()).unwrap();
            let token = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(sig));
            assert!(matches!(
                codec.decode(&token),
                Err(TokenError::InvalidPayload)
            ));
        }
    }

    #[test]
    fn missing_expiry_fails_fast() {
        let codec = codec();
        let payload =
            URL_SAFE_NO_PAD.encode(br#"{"sub":"u1","email":"u1@x.com","roles":[],"iat":1}"#);
        let sig = codec.sign(payload.as_bytes()).unwrap();
        let token = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(sig));
        assert!(matches!(
            codec.decode(&token),
            Err(TokenError::InvalidPayload)
        ));
    }

    #[test]
    fn different_secret_rejects() {
        let token = codec().encode(&claims()).unwrap();
        let other = TokenCodec::new("not-k", "sha256").unwrap();
        assert!(matches!(
            other.decode(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn sha512_round_trip() {
        let codec = TokenCodec::new("k", "sha512").unwrap();
        let token = codec.encode(&claims()).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), claims());
    }

    #[test]
    fn unknown_algorithm_fails_at_construction() {
        assert!(matches!(
            TokenCodec::new("k", "md5"),
            Err(TokenError::UnsupportedAlgorithm(name)) if name == "md5"
        ));
    }
}
