//! Password hashing and session token signing.
//!
//! Session tokens are EdDSA (Ed25519) JWTs. The signing key is parsed once
//! when the [`TokenIssuer`] is built; a bad key fails startup rather than the
//! first login.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::UsError;
use common::jwt::{iat_within_skew, SessionClaims, MAX_JWT_SIZE_BYTES};
use common::types::Identity;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Why a token failed verification. Only ever logged; callers see one
/// generic rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,
}

impl TokenError {
    pub fn as_label(self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired => "expired",
        }
    }
}

/// A freshly issued session token.
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
    /// Lifetime in seconds, as reported to the client.
    pub expires_in: u64,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Signs and verifies session tokens. Never consults external state.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock_skew: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer from a PKCS#8 Ed25519 private key.
    ///
    /// # Errors
    ///
    /// Returns `UsError::Crypto` if the key does not parse.
    pub fn new(private_key_pkcs8: &[u8], ttl: Duration, clock_skew: Duration) -> Result<Self, UsError> {
        let key_pair = Ed25519KeyPair::from_pkcs8(private_key_pkcs8)
            .map_err(|e| UsError::Crypto(format!("Invalid signing key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(private_key_pkcs8),
            decoding_key: DecodingKey::from_ed_der(key_pair.public_key().as_ref()),
            validation,
            ttl,
            clock_skew,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `identity`, valid for the configured TTL.
    ///
    /// Every token carries a fresh `jti`, so repeated logins never collide.
    #[instrument(skip_all, name = "us.crypto.issue")]
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, UsError> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = self.ttl.as_secs();
        let claims = SessionClaims {
            sub: identity.subject_id.clone(),
            username: identity.username.clone(),
            role: identity.role,
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            claims,
            expires_in: ttl_secs,
        })
    }

    pub(crate) fn sign(&self, claims: &SessionClaims) -> Result<String, UsError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| UsError::Crypto(format!("JWT signing operation failed: {e}")))
    }

    /// Check signature, expiry and `iat`; return the claims.
    #[instrument(skip_all, name = "us.crypto.verify")]
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "us.crypto",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenError::Malformed);
        }

        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                let err = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                    _ => TokenError::Malformed,
                };
                tracing::debug!(target: "us.crypto", error = %e, reason = err.as_label(), "Token verification failed");
                err
            },
        )?;

        if !iat_within_skew(data.claims.iat, self.clock_skew, chrono::Utc::now().timestamp()) {
            return Err(TokenError::Malformed);
        }

        Ok(data.claims)
    }
}

/// Generate a new Ed25519 key pair; returns the PKCS#8 document.
pub fn generate_signing_key() -> Result<Vec<u8>, UsError> {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| UsError::Crypto(format!("Keypair generation failed: {e}")))?;
    Ok(pkcs8.as_ref().to_vec())
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `UsError::Crypto` if the cost is outside
/// `MIN_BCRYPT_COST..=MAX_BCRYPT_COST` or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, UsError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(UsError::Crypto(format!(
            "Invalid bcrypt cost: {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
        )));
    }

    bcrypt::hash(password, cost).map_err(|e| UsError::Crypto(format!("Password hashing failed: {e}")))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, UsError> {
    bcrypt::verify(password, hash)
        .map_err(|e| UsError::Crypto(format!("Password verification failed: {e}")))
}
