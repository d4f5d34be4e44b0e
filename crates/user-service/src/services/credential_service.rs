//! Credential store: verifies usernames and passwords, registers users.
//!
//! Unknown usernames and wrong passwords are indistinguishable to callers.
//! Both paths run one bcrypt verification at the configured cost.

use crate::crypto;
use crate::errors::UsError;
use crate::models::{RegisterRequest, UserProfile};
use crate::repositories::{NewUser, UserRepository};
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use std::sync::Arc;
use tracing::instrument;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 72;
pub(crate) const MAX_USERNAME_LENGTH: usize = 64;

pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
    /// Hash verified against when the username is unknown.
    dummy_hash: String,
}

impl CredentialStore {
    /// # Errors
    ///
    /// Returns `UsError::Crypto` if `bcrypt_cost` is out of range.
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Result<Self, UsError> {
        let dummy_hash = crypto::hash_password("timing-equalizer-not-a-password", bcrypt_cost)?;
        Ok(Self {
            users,
            bcrypt_cost,
            dummy_hash,
        })
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown user or wrong password; storage
    /// errors propagate unchanged.
    #[instrument(skip_all, name = "us.credentials.verify")]
    pub async fn verify(&self, username: &str, password: &SecretString) -> Result<UserProfile, UsError> {
        let user = self.users.find_by_username(username).await?;

        let hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());
        let matches = check_password(password.clone(), hash).await?;

        match user {
            Some(user) if matches => user.profile(),
            _ => {
                tracing::debug!(target: "us.services.credentials", "Credential verification failed");
                Err(UsError::InvalidCredentials)
            }
        }
    }

    /// Register a new user with the default `user` role.
    #[instrument(skip_all, name = "us.credentials.register")]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, UsError> {
        let username = request.username.trim();
        let email = request.email.trim();
        let full_name = request.fullname.trim();
        let password = request.password.expose_secret();

        if username.is_empty() || email.is_empty() || full_name.is_empty() || password.is_empty() {
            return Err(UsError::BadRequest(
                "username, email, password and fullname are required".to_string(),
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
        // bcrypt ignores bytes past 72.
        if password.len() < MIN_PASSWORD_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
            return Err(UsError::BadRequest(format!(
                "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
            )));
        }

        if self.users.username_exists(username).await? {
            return Err(UsError::Conflict("Username already taken".to_string()));
        }
        if self.users.email_exists(email).await? {
            return Err(UsError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_in_background(request.password.clone(), self.bcrypt_cost).await?;

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                full_name: full_name.to_string(),
                role: Role::User,
            })
            .await?;

        tracing::info!(target: "us.services.credentials", user_id = %user.id, "User registered");
        user.profile()
    }
}

// bcrypt is deliberately slow; keep it off the async workers.
async fn check_password(password: SecretString, hash: String) -> Result<bool, UsError> {
    tokio::task::spawn_blocking(move || crypto::verify_password(password.expose_secret(), &hash))
        .await
        .map_err(|e| {
            tracing::error!(target: "us.services.credentials", error = %e, "Password verification task failed");
            UsError::Internal
        })?
}

async fn hash_in_background(password: SecretString, cost: u32) -> Result<String, UsError> {
    tokio::task::spawn_blocking(move || crypto::hash_password(password.expose_secret(), cost))
        .await
        .map_err(|e| {
            tracing::error!(target: "us.services.credentials", error = %e, "Password hashing task failed");
            UsError::Internal
        })?
}

/// Basic shape check: `local@domain.tld` with no empty parts.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::repositories::InMemoryUserRepository;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(InMemoryUserRepository::new()), MIN_BCRYPT_COST).unwrap()
    }

    fn registration(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
            fullname: "Alice Liddell".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let store = store();
        let profile = store
            .register(registration("alice", "alice@example.com", "wonderland"))
            .await
            .unwrap();
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.fullname, "Alice Liddell");

        let verified = store
            .verify("alice", &SecretString::from("wonderland"))
            .await
            .unwrap();
        assert_eq!(verified.id, profile.id);
        assert_eq!(verified.identity().subject_id, profile.id.to_string());
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_identical() {
        let store = store();
        store
            .register(registration("alice", "alice@example.com", "wonderland"))
            .await
            .unwrap();

        let wrong_password = store.verify("alice", &SecretString::from("looking-glass")).await;
        let unknown_user = store.verify("bob", &SecretString::from("wonderland")).await;

        assert!(matches!(wrong_password, Err(UsError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(UsError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields() {
        let store = store();
        let mut request = registration("alice", "alice@example.com", "wonderland");
        request.fullname = "   ".to_string();
        assert!(matches!(store.register(request).await, Err(UsError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let result = store()
            .register(registration("alice", "alice@example.com", "short"))
            .await;
        assert!(matches!(result, Err(UsError::BadRequest(msg)) if msg.contains("between 8 and 72")));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let store = store();
        store
            .register(registration("alice", "alice@example.com", "wonderland"))
            .await
            .unwrap();

        let same_name = store
            .register(registration("alice", "alice2@example.com", "wonderland"))
            .await;
        assert!(matches!(same_name, Err(UsError::Conflict(msg)) if msg == "Username already taken"));

        let same_email = store
            .register(registration("alice2", "alice@example.com", "wonderland"))
            .await;
        assert!(matches!(same_email, Err(UsError::Conflict(msg)) if msg == "Email already registered"));
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a@b..co"));
        assert!(!is_valid_email("plain"));
    }
}
