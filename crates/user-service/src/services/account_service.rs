//! Account management: profile lookup, listing, profile edits and deletion.
//!
//! Deleting an account also revokes every session it holds. Sessions are
//! revoked before the row is removed, so a registry outage fails the delete
//! with nothing changed, and once more afterwards to catch a login that
//! raced the delete.

use crate::errors::UsError;
use crate::models::{UpdateUserRequest, UserPage, UserProfile};
use crate::repositories::{SessionRegistry, User, UserChanges, UserRepository};
use crate::services::credential_service::{is_valid_email, MAX_USERNAME_LENGTH};
use common::deadline::Deadline;
use common::pagination::Pagination;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    registry: Arc<dyn SessionRegistry>,
    registry_timeout: Duration,
}

fn user_not_found() -> UsError {
    UsError::NotFound("User not found".to_string())
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        registry: Arc<dyn SessionRegistry>,
        registry_timeout: Duration,
    ) -> Self {
        Self {
            users,
            registry,
            registry_timeout,
        }
    }

    /// Public profile for a subject id.
    pub async fn profile(&self, id: Uuid) -> Result<UserProfile, UsError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(user_not_found)?
            .profile()
    }

    #[instrument(skip_all, name = "us.accounts.list")]
    pub async fn list(&self, page: Pagination) -> Result<UserPage, UsError> {
        let (users, total) = self.users.list(page).await?;
        let profiles = users
            .iter()
            .map(User::profile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.page_of(profiles, total))
    }

    /// Replace username, email and full name.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no user has `id`.
    /// - `BadRequest` for missing or malformed fields.
    /// - `Conflict` when another user holds the username or email.
    #[instrument(skip_all, name = "us.accounts.update", fields(user_id = %id))]
    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> Result<UserProfile, UsError> {
        if self.users.find_by_id(id).await?.is_none() {
            return Err(user_not_found());
        }

        let username = request.username.trim();
        let email = request.email.trim();
        let full_name = request.fullname.trim();
        if username.is_empty() || email.is_empty() || full_name.is_empty() {
            return Err(UsError::BadRequest(
                "username, email and fullname are required".to_string(),
            ));
        }
        if username.len() > MAX_USERNAME_LENGTH {
            return Err(UsError::BadRequest(format!(
                "Username must be at most {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if !is_valid_email(email) {
            return Err(UsError::BadRequest("Invalid email format".to_string()));
        }

        if let Some(holder) = self.users.find_by_username(username).await? {
            if holder.id != id {
                return Err(UsError::Conflict("Username already taken".to_string()));
            }
        }
        if let Some(holder) = self.users.find_by_email(email).await? {
            if holder.id != id {
                return Err(UsError::Conflict("Email already registered".to_string()));
            }
        }

        let user = self
            .users
            .update(
                id,
                UserChanges {
                    username: username.to_string(),
                    email: email.to_string(),
                    full_name: full_name.to_string(),
                },
            )
            .await?
            .ok_or_else(user_not_found)?;

        tracing::info!(target: "us.services.accounts", user_id = %id, "User updated");
        user.profile()
    }

    /// Delete the account and revoke its sessions.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no user has `id`.
    /// - `ServiceUnavailable` when the sessions cannot be revoked before
    ///   `deadline`; the account is kept in that case.
    #[instrument(skip_all, name = "us.accounts.delete", fields(user_id = %id))]
    pub async fn delete(&self, id: Uuid, deadline: &Deadline) -> Result<(), UsError> {
        if self.users.find_by_id(id).await?.is_none() {
            return Err(user_not_found());
        }

        let subject_id = id.to_string();
        let revoked = self.revoke_sessions(&subject_id, deadline).await?;

        if !self.users.delete(id).await? {
            return Err(user_not_found());
        }

        if let Err(e) = self.revoke_sessions(&subject_id, deadline).await {
            tracing::error!(target: "us.services.accounts", user_id = %id, error = %e, "Failed to revoke sessions after delete");
        }

        tracing::info!(target: "us.services.accounts", user_id = %id, revoked, "User deleted");
        Ok(())
    }

    async fn revoke_sessions(&self, subject_id: &str, deadline: &Deadline) -> Result<u64, UsError> {
        match deadline
            .run(self.registry_timeout, self.registry.revoke_subject(subject_id))
            .await
        {
            Ok(Ok(revoked)) => Ok(revoked),
            Ok(Err(e)) => Err(UsError::ServiceUnavailable(format!(
                "Failed to revoke sessions: {e}"
            ))),
            Err(_) => Err(UsError::ServiceUnavailable(
                "Deadline exceeded while revoking sessions".to_string(),
            )),
        }
    }
}
