//! Request/response payloads for the user service API.

use chrono::{DateTime, Utc};
use common::pagination::Page;
use common::secret::SecretString;
use common::types::{Identity, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub fullname: String,
}

/// Full replacement of the editable profile fields.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    pub fullname: String,
}

pub type UserPage = Page<UserProfile>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
}

/// Not `Debug`: carries the bearer token.
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

impl UserProfile {
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.id.to_string(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}
