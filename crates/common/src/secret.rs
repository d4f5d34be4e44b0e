//! Secret wrappers for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every service uses the same types for passwords,
//! bearer tokens, signing keys and connection URLs that embed credentials.
//! `Debug` on these types prints a redaction marker, so a struct that derives
//! `Debug` stays safe to log even when one of its fields is secret.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     username: "alice".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{form:?}").contains("hunter2"));
//! assert_eq!(form.password.expose_secret(), "hunter2");
//! ```
//!
//! Use `SecretString` for passwords, bearer tokens and URLs. Use
//! `SecretBox<Vec<u8>>` for binary key material such as a PKCS#8 document.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
