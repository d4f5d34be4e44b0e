//! Business logic for the user service.
//!
//! - `credential_service` - password verification and registration
//! - `session_service` - token + registry validation
//! - `auth_service` - login and logout
//! - `account_service` - profile listing, edits and deletion

pub mod account_service;
pub mod auth_service;
pub mod credential_service;
pub mod session_service;

pub use account_service::AccountService;
pub use auth_service::AuthService;
pub use credential_service::CredentialStore;
pub use session_service::SessionValidator;
