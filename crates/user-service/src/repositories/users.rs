//! User repository.
//!
//! `PgUserRepository` backs production; `InMemoryUserRepository` backs tests
//! and local runs without a database.

use crate::errors::UsError;
use crate::models::UserProfile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::pagination::Pagination;
use common::types::Role;
use sqlx::PgPool;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User row (maps to the `users` table).
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl User {
    /// Parsed role. An unknown value in storage is an internal error, never
    /// a silent downgrade.
    pub fn role(&self) -> Result<Role, UsError> {
        self.role.parse().map_err(|_| {
            tracing::error!(target: "us.repositories.users", user_id = %self.id, "Stored role is not recognised");
            UsError::Internal
        })
    }

    pub fn profile(&self) -> Result<UserProfile, UsError> {
        Ok(UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.full_name.clone(),
            role: self.role()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Data for inserting a user. The password is already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// New values for the editable profile fields.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UsError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UsError>;

    /// Case-insensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UsError>;

    async fn username_exists(&self, username: &str) -> Result<bool, UsError>;

    async fn email_exists(&self, email: &str) -> Result<bool, UsError>;

    /// Insert a user. A uniqueness violation is reported as `Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User, UsError>;

    /// Newest first, with the total row count.
    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64), UsError>;

    /// `None` if no user has `id`. A uniqueness violation is `Conflict`.
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, UsError>;

    /// Whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, UsError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, role, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UsError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UsError::Database(format!("Failed to fetch user by username: {e}")))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UsError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UsError::Database(format!("Failed to fetch user by id: {e}")))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UsError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UsError::Database(format!("Failed to fetch user by email: {e}")))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, UsError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, UsError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UsError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.full_name)
            .bind(new_user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UsError::Conflict("Username or email already registered".to_string())
                } else {
                    UsError::Database(format!("Failed to create user: {e}"))
                }
            })
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64), UsError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| UsError::Database(format!("Failed to list users: {e}")))?;
        Ok((users, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, UsError> {
        let query = format!(
            "UPDATE users SET username = $2, email = $3, full_name = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.full_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UsError::Conflict("Username or email already registered".to_string())
                } else {
                    UsError::Database(format!("Failed to update user: {e}"))
                }
            })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, UsError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| UsError::Database(format!("Failed to delete user: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UsError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UsError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UsError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, UsError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, UsError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UsError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| {
            u.username == new_user.username || u.email.eq_ignore_ascii_case(&new_user.email)
        }) {
            return Err(UsError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            role: new_user.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64), UsError> {
        let users = self.users.read().await;
        let total = i64::try_from(users.len()).map_err(|_| UsError::Internal)?;
        let skip = usize::try_from(page.offset()).map_err(|_| UsError::Internal)?;
        // Insertion order is creation order; newest first.
        let data = users
            .iter()
            .rev()
            .skip(skip)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((data, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, UsError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| {
            u.id != id
                && (u.username == changes.username
                    || u.email.eq_ignore_ascii_case(&changes.email))
        }) {
            return Err(UsError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.username = changes.username;
        user.email = changes.email;
        user.full_name = changes.full_name;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, UsError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$10$hash".to_string(),
            full_name: "Test User".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let dup_name = repo.create(new_user("alice", "other@example.com")).await;
        assert!(matches!(dup_name, Err(UsError::Conflict(_))));

        let dup_email = repo.create(new_user("alice2", "ALICE@example.com")).await;
        assert!(matches!(dup_email, Err(UsError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_exists_checks() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        assert!(repo.username_exists("alice").await.unwrap());
        assert!(!repo.username_exists("carol").await.unwrap());
        assert!(repo.email_exists("Alice@Example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_total() {
        let repo = InMemoryUserRepository::new();
        for name in ["a", "b", "c"] {
            repo.create(new_user(name, &format!("{name}@example.com"))).await.unwrap();
        }

        let (first, total) = repo.list(Pagination { page: 1, limit: 2 }).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = first.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);

        let (second, _) = repo.list(Pagination { page: 2, limit: 2 }).await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.create(new_user("alice", "alice@example.com")).await.unwrap();
        repo.create(new_user("bob", "bob@example.com")).await.unwrap();

        let changes = |username: &str, email: &str| UserChanges {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Alice L".to_string(),
        };

        let updated = repo.update(alice.id, changes("alice2", "alice@example.com")).await.unwrap().unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.full_name, "Alice L");

        let taken = repo.update(alice.id, changes("bob", "alice@example.com")).await;
        assert!(matches!(taken, Err(UsError::Conflict(_))));

        assert!(repo.update(Uuid::new_v4(), changes("x", "x@example.com")).await.unwrap().is_none());

        assert!(repo.delete(alice.id).await.unwrap());
        assert!(!repo.delete(alice.id).await.unwrap());
        assert!(repo.find_by_id(alice.id).await.unwrap().is_none());
    }

    #[test]
    fn test_unknown_stored_role_is_internal_error() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "mallory".to_string(),
            email: "m@example.com".to_string(),
            password_hash: "x".to_string(),
            full_name: "M".to_string(),
            role: "superuser".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(user.profile(), Err(UsError::Internal)));
    }

    #[test]
    fn test_debug_redacts_hash_and_email() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$12$secretsecret".to_string(),
            full_name: "Alice".to_string(),
            role: "user".to_string(),
            created_at: now,
            updated_at: now,
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("secretsecret"));
        assert!(!debug.contains("alice@example.com"));
    }
}
