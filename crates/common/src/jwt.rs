//! Session token claims and validation constants.
//!
//! Session tokens are EdDSA-signed JWTs issued by the user service at login.
//! A valid signature is necessary but not sufficient: the token must also be
//! present in the session registry, which is what makes logout effective.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - The `sub`, `username` and `jti` claims are redacted in Debug output
//! - Error messages are generic so callers cannot learn why a token failed

use crate::types::{Identity, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Maximum accepted session token size in bytes (8KB).
///
/// Anything larger is rejected before base64 decoding or signature checks.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default tolerance for `iat` values slightly in the future.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound on configurable clock skew.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Claims carried by a session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user's id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issued-at (Unix epoch seconds).
    pub iat: i64,
    /// Expiration (Unix epoch seconds).
    pub exp: i64,
    /// Unique token id; two logins in the same second still differ.
    pub jti: String,
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &"[REDACTED]")
            .field("username", &"[REDACTED]")
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &"[REDACTED]")
            .finish()
    }
}

impl SessionClaims {
    /// The identity this token was issued for.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.sub.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// True when `iat` is no more than `clock_skew` ahead of `now`.
#[must_use]
pub fn iat_within_skew(iat: i64, clock_skew: Duration, now: i64) -> bool {
    // clock_skew is bounded by MAX_CLOCK_SKEW, so the cast cannot wrap
    #[allow(clippy::cast_possible_wrap)]
    let skew = clock_skew.as_secs() as i64;
    let ok = iat <= now.saturating_add(skew);
    if !ok {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: iat too far in the future"
        );
    }
    ok
}
