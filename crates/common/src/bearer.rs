//! `Authorization: Bearer <token>` parsing.
//!
//! Used by the gateway before it spends a network call on validation and by
//! the user service's logout endpoint.

use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BearerError {
    #[error("Missing Authorization header")]
    Missing,

    #[error("Authorization header is not valid UTF-8")]
    NotUtf8,

    #[error("Authorization scheme is not Bearer")]
    WrongScheme,

    #[error("Bearer token is empty")]
    Empty,
}

/// Extract the token from a raw `Authorization` header value.
///
/// # Errors
///
/// Returns a [`BearerError`] when the header is absent, not UTF-8, uses a
/// scheme other than `Bearer`, or carries an empty token.
pub fn extract_bearer(header: Option<&[u8]>) -> Result<&str, BearerError> {
    let raw = header.ok_or(BearerError::Missing)?;
    let value = std::str::from_utf8(raw).map_err(|_| BearerError::NotUtf8)?;
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(BearerError::WrongScheme)?
        .trim();
    if token.is_empty() {
        return Err(BearerError::Empty);
    }
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_token() {
        assert_eq!(extract_bearer(Some(b"Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        assert_eq!(extract_bearer(Some(b"Bearer tok  ")), Ok("tok"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer(None), Err(BearerError::Missing));
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert_eq!(
            extract_bearer(Some(b"Basic dXNlcjpwYXNz")),
            Err(BearerError::WrongScheme)
        );
        assert_eq!(extract_bearer(Some(b"bearer tok")), Err(BearerError::WrongScheme));
        assert_eq!(extract_bearer(Some(b"tok")), Err(BearerError::WrongScheme));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert_eq!(extract_bearer(Some(b"Bearer ")), Err(BearerError::Empty));
        assert_eq!(extract_bearer(Some(b"Bearer    ")), Err(BearerError::Empty));
    }

    #[test]
    fn test_non_utf8_rejected() {
        assert_eq!(
            extract_bearer(Some(&[0x42, 0xff, 0xfe])),
            Err(BearerError::NotUtf8)
        );
    }
}
