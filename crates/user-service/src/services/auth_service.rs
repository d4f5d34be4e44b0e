//! Login and logout.
//!
//! Login verifies credentials, issues a token, and records the session. If
//! the session cannot be recorded the login fails and no token is returned;
//! a token the registry does not know about would be rejected on first use.
//!
//! Both registry writes are bounded by the caller's [`Deadline`] the same way
//! session validation bounds its lookup.

use crate::crypto::TokenIssuer;
use crate::errors::UsError;
use crate::models::LoginResponse;
use crate::observability::metrics::{record_login, record_logout};
use crate::repositories::SessionRegistry;
use crate::services::credential_service::CredentialStore;
use common::deadline::Deadline;
use common::secret::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub struct AuthService {
    credentials: Arc<CredentialStore>,
    issuer: Arc<TokenIssuer>,
    registry: Arc<dyn SessionRegistry>,
    registry_timeout: Duration,
}

impl AuthService {
    pub fn new(
        credentials: Arc<CredentialStore>,
        issuer: Arc<TokenIssuer>,
        registry: Arc<dyn SessionRegistry>,
        registry_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            issuer,
            registry,
            registry_timeout,
        }
    }

    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown user or wrong password.
    /// - `ServiceUnavailable` when the session cannot be recorded before
    ///   `deadline`; no token is returned.
    #[instrument(skip_all, name = "us.auth.login")]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        deadline: &Deadline,
    ) -> Result<LoginResponse, UsError> {
        let profile = match self.credentials.verify(username, password).await {
            Ok(profile) => profile,
            Err(e) => {
                record_login(match e {
                    UsError::InvalidCredentials => "invalid_credentials",
                    _ => "error",
                });
                return Err(e);
            }
        };

        let issued = self.issuer.issue(&profile.identity())?;

        let put = self
            .registry
            .put(&issued.token, &issued.claims.sub, self.issuer.ttl());
        match deadline.run(self.registry_timeout, put).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                record_login("unavailable");
                return Err(UsError::ServiceUnavailable(format!(
                    "Failed to record session: {e}"
                )));
            }
            Err(_) => {
                record_login("unavailable");
                return Err(UsError::ServiceUnavailable(
                    "Deadline exceeded while recording session".to_string(),
                ));
            }
        }

        record_login("success");
        tracing::info!(target: "us.services.auth", user_id = %profile.id, "User logged in");

        Ok(LoginResponse {
            user: profile,
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
        })
    }

    /// Revoke the session for `token`. Unknown or already revoked tokens
    /// succeed.
    ///
    /// # Errors
    ///
    /// `ServiceUnavailable` if the registry cannot be reached before
    /// `deadline`; the session may still be live in that case.
    #[instrument(skip_all, name = "us.auth.logout")]
    pub async fn logout(&self, token: &str, deadline: &Deadline) -> Result<(), UsError> {
        match deadline
            .run(self.registry_timeout, self.registry.revoke(token))
            .await
        {
            Ok(Ok(())) => {
                record_logout("success");
                Ok(())
            }
            Ok(Err(e)) => {
                record_logout("error");
                Err(UsError::ServiceUnavailable(format!(
                    "Failed to revoke session: {e}"
                )))
            }
            Err(_) => {
                record_logout("error");
                Err(UsError::ServiceUnavailable(
                    "Deadline exceeded while revoking session".to_string(),
                ))
            }
        }
    }
}
