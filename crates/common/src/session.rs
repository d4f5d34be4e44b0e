//! Wire contract for session validation between the gateway and the user
//! service, plus the headers that carry an authenticated identity
//! downstream.

use crate::types::{Identity, Role};
use serde::{Deserialize, Serialize};

/// Path of the user service's internal validation endpoint.
pub const VALIDATE_SESSION_PATH: &str = "/internal/v1/sessions/validate";

/// Header carrying the authenticated subject id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated username.
pub const USERNAME_HEADER: &str = "x-username";
/// Header carrying the authenticated role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity headers; the gateway strips any client-supplied copies.
pub const IDENTITY_HEADERS: [&str; 3] = [USER_ID_HEADER, USERNAME_HEADER, USER_ROLE_HEADER];

#[derive(Clone, Serialize, Deserialize)]
pub struct ValidateSessionRequest {
    pub token: String,
}

// Keep tokens out of logs.
impl std::fmt::Debug for ValidateSessionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidateSessionRequest")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Successful validation. Failures use the shared error body and a non-2xx
/// status instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateSessionResponse {
    pub valid: bool,
    pub subject_id: String,
    pub username: String,
    pub role: Role,
}

impl From<Identity> for ValidateSessionResponse {
    fn from(identity: Identity) -> Self {
        Self {
            valid: true,
            subject_id: identity.subject_id,
            username: identity.username,
            role: identity.role,
        }
    }
}

impl ValidateSessionResponse {
    /// The identity, if the response actually says the session is valid.
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        self.valid.then_some(Identity {
            subject_id: self.subject_id,
            username: self.username,
            role: self.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_debug_hides_token() {
        let req = ValidateSessionRequest {
            token: "abc.def.ghi".to_string(),
        };
        assert!(!format!("{req:?}").contains("abc.def.ghi"));
    }

    #[test]
    fn test_response_wire_shape() {
        let resp = ValidateSessionResponse::from(Identity {
            subject_id: "u-1".to_string(),
            username: "alice".to_string(),
            role: Role::User,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"valid": true, "subject_id": "u-1", "username": "alice", "role": "user"})
        );
    }

    #[test]
    fn test_invalid_response_yields_no_identity() {
        let resp = ValidateSessionResponse {
            valid: false,
            subject_id: "u-1".to_string(),
            username: "alice".to_string(),
            role: Role::Admin,
        };
        assert!(resp.into_identity().is_none());
    }
}
