//! Session validator: the single place a bearer token is judged.
//!
//! A token is accepted only when all of these hold:
//! 1. its signature and expiry verify ([`TokenIssuer::verify`]),
//! 2. the session registry still holds a record for it,
//! 3. that record names the same subject as the token.
//!
//! The registry lookup is bounded by the caller's [`Deadline`]. A registry
//! that is down or slow yields `ServiceUnavailable`, never a rejection, so
//! callers can tell "try again" from "log in again".

use crate::crypto::TokenIssuer;
use crate::errors::UsError;
use crate::observability::metrics::record_session_validation;
use crate::repositories::SessionRegistry;
use common::deadline::Deadline;
use common::types::Identity;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

pub struct SessionValidator {
    issuer: Arc<TokenIssuer>,
    registry: Arc<dyn SessionRegistry>,
    registry_timeout: Duration,
}

impl SessionValidator {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        registry: Arc<dyn SessionRegistry>,
        registry_timeout: Duration,
    ) -> Self {
        Self {
            issuer,
            registry,
            registry_timeout,
        }
    }

    /// Validate `token` and return the identity it was issued for.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for a bad signature, expired or malformed token, a
    ///   revoked or unknown session, or a subject mismatch. The message is
    ///   the same in every case.
    /// - `ServiceUnavailable` when the registry fails or the deadline runs out.
    #[instrument(skip_all, name = "us.sessions.authorize")]
    pub async fn authorize(&self, token: &str, deadline: &Deadline) -> Result<Identity, UsError> {
        let start = Instant::now();

        let claims = match self.issuer.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                record_session_validation("invalid", e.as_label(), start.elapsed());
                return Err(UsError::invalid_token());
            }
        };

        let resolved = match deadline
            .run(self.registry_timeout, self.registry.resolve(token))
            .await
        {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(e)) => {
                record_session_validation("unavailable", "registry", start.elapsed());
                return Err(UsError::ServiceUnavailable(format!(
                    "Session registry lookup failed: {e}"
                )));
            }
            Err(_) => {
                record_session_validation("unavailable", "deadline", start.elapsed());
                return Err(UsError::ServiceUnavailable(
                    "Deadline exceeded during session registry lookup".to_string(),
                ));
            }
        };

        match resolved {
            None => {
                tracing::debug!(target: "us.services.session", "Session not found or revoked");
                record_session_validation("invalid", "revoked", start.elapsed());
                Err(UsError::invalid_token())
            }
            Some(subject_id) if subject_id != claims.sub => {
                tracing::warn!(target: "us.services.session", "Session record names a different subject");
                record_session_validation("invalid", "subject_mismatch", start.elapsed());
                Err(UsError::invalid_token())
            }
            Some(_) => {
                record_session_validation("valid", "none", start.elapsed());
                Ok(claims.identity())
            }
        }
    }
}
