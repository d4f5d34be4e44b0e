//! Session authority client.
//!
//! The gateway never judges tokens itself; it asks the user service, which
//! checks the signature and the revocable session registry together.
//!
//! # Outcome mapping
//!
//! | user service reply             | result                 |
//! |--------------------------------|------------------------|
//! | 200 with `valid: true`         | `Ok(Identity)`         |
//! | 401, or 200 with `valid: false`| `InvalidToken`         |
//! | 5xx, other status, bad body    | `ServiceUnavailable`   |
//! | connect error, per-call timeout| `ServiceUnavailable`   |
//! | request deadline exhausted     | `GatewayTimeout`       |

use crate::errors::GwError;
use async_trait::async_trait;
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use common::session::{ValidateSessionRequest, ValidateSessionResponse, VALIDATE_SESSION_PATH};
use common::types::Identity;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Message for every rejected token, whatever the cause.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Decides whether a bearer token names a live session.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    async fn validate(&self, token: &str, deadline: &Deadline) -> Result<Identity, GwError>;
}

/// HTTP client for the user service's validation endpoint.
#[derive(Clone)]
pub struct HttpSessionClient {
    client: Client,
    validate_url: String,
    per_call_timeout: Duration,
}

impl HttpSessionClient {
    /// # Errors
    ///
    /// Returns `GwError::Internal` if the HTTP client cannot be built.
    pub fn new(user_service_url: &str, per_call_timeout: Duration) -> Result<Self, GwError> {
        let client = Client::builder()
            .connect_timeout(per_call_timeout)
            .build()
            .map_err(|e| {
                error!(target: "gw.services.session_client", error = %e, "Failed to build HTTP client");
                GwError::Internal
            })?;

        Ok(Self {
            client,
            validate_url: format!("{user_service_url}{VALIDATE_SESSION_PATH}"),
            per_call_timeout,
        })
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionClient {
    #[instrument(skip_all, name = "gw.session_client.validate")]
    async fn validate(&self, token: &str, deadline: &Deadline) -> Result<Identity, GwError> {
        if deadline.is_expired() {
            return Err(GwError::GatewayTimeout(
                "Deadline exhausted before session validation".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.validate_url)
            .timeout(deadline.budget(self.per_call_timeout))
            .header(REQUEST_TIMEOUT_HEADER, deadline.header_value())
            .json(&ValidateSessionRequest {
                token: token.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() && deadline.is_expired() {
                    GwError::GatewayTimeout("Deadline exhausted during session validation".to_string())
                } else {
                    warn!(target: "gw.services.session_client", error = %e, "Session validation request failed");
                    GwError::ServiceUnavailable("User service is unavailable".to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let body: ValidateSessionResponse = response.json().await.map_err(|e| {
                    warn!(target: "gw.services.session_client", error = %e, "Malformed validation response");
                    GwError::ServiceUnavailable("Malformed response from user service".to_string())
                })?;
                body.into_identity()
                    .ok_or_else(|| GwError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()))
            }
            StatusCode::UNAUTHORIZED => {
                debug!(target: "gw.services.session_client", "Session rejected by user service");
                Err(GwError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()))
            }
            status => {
                warn!(target: "gw.services.session_client", status = %status, "Unexpected status from user service");
                Err(GwError::ServiceUnavailable(format!(
                    "User service returned {status}"
                )))
            }
        }
    }
}

/// Mock session authority for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Accept(Identity),
        Reject,
        Fail,
    }

    /// Returns a fixed outcome and counts calls.
    pub struct MockSessionAuthority {
        behaviour: Behaviour,
        call_count: AtomicUsize,
    }

    impl MockSessionAuthority {
        /// Accept every token as `identity`.
        pub fn accepting(identity: Identity) -> Self {
            Self {
                behaviour: Behaviour::Accept(identity),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Reject every token.
        pub fn rejecting() -> Self {
            Self {
                behaviour: Behaviour::Reject,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Report the user service as unavailable.
        pub fn failing() -> Self {
            Self {
                behaviour: Behaviour::Fail,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionAuthority for MockSessionAuthority {
        async fn validate(&self, _token: &str, _deadline: &Deadline) -> Result<Identity, GwError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Accept(identity) => Ok(identity.clone()),
                Behaviour::Reject => Err(GwError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())),
                Behaviour::Fail => Err(GwError::ServiceUnavailable(
                    "Mock user service unavailable".to_string(),
                )),
            }
        }
    }
}
