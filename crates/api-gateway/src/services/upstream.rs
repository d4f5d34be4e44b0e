//! Reverse-proxy forwarding to the user, book and category services.
//!
//! Requests are forwarded with their method, path, query and body. Headers
//! are copied minus hop-by-hop headers; client-supplied identity and
//! deadline headers are always replaced by the gateway's own.

use crate::errors::GwError;
use crate::observability::metrics::record_upstream_request;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use common::session::{IDENTITY_HEADERS, USERNAME_HEADER, USER_ID_HEADER, USER_ROLE_HEADER};
use common::types::Identity;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Largest request body the gateway will buffer and forward.
pub const MAX_PROXY_BODY_BYTES: usize = 1024 * 1024;

static HOP_BY_HOP_HEADERS: [HeaderName; 9] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Users,
    Books,
    Categories,
}

impl Upstream {
    pub fn as_label(self) -> &'static str {
        match self {
            Upstream::Users => "users",
            Upstream::Books => "books",
            Upstream::Categories => "categories",
        }
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    per_call_timeout: Duration,
}

impl UpstreamClient {
    /// # Errors
    ///
    /// Returns `GwError::Internal` if the HTTP client cannot be built.
    pub fn new(per_call_timeout: Duration) -> Result<Self, GwError> {
        let client = Client::builder()
            .connect_timeout(per_call_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                error!(target: "gw.services.upstream", error = %e, "Failed to build HTTP client");
                GwError::Internal
            })?;

        Ok(Self {
            client,
            per_call_timeout,
        })
    }

    /// Forward `request` to `base_url`, returning the upstream response
    /// as-is (minus hop-by-hop headers).
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the body exceeds [`MAX_PROXY_BODY_BYTES`]
    /// - `GatewayTimeout` if the request deadline runs out
    /// - `ServiceUnavailable` if the upstream is unreachable or too slow
    #[instrument(skip_all, name = "gw.upstream.forward", fields(upstream = upstream.as_label()))]
    pub async fn forward(
        &self,
        upstream: Upstream,
        base_url: &str,
        request: Request,
        identity: Option<&Identity>,
        deadline: &Deadline,
    ) -> Result<Response, GwError> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        let url = format!("{base_url}{path_and_query}");

        let mut headers = forwardable_headers(&parts.headers);
        if let Some(identity) = identity {
            insert_identity(&mut headers, identity)?;
        }
        if let Ok(value) = HeaderValue::from_str(&deadline.header_value()) {
            headers.insert(REQUEST_TIMEOUT_HEADER, value);
        }

        let body = to_bytes(body, MAX_PROXY_BODY_BYTES)
            .await
            .map_err(|_| GwError::BadRequest("Request body too large".to_string()))?;

        if deadline.is_expired() {
            record_upstream_request(upstream.as_label(), "timeout", start.elapsed());
            return Err(GwError::GatewayTimeout(format!(
                "Deadline exhausted before forwarding to {}",
                upstream.as_label()
            )));
        }

        let upstream_response = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .timeout(deadline.budget(self.per_call_timeout))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() && deadline.is_expired() {
                    record_upstream_request(upstream.as_label(), "timeout", start.elapsed());
                    GwError::GatewayTimeout(format!(
                        "Deadline exhausted waiting for {}",
                        upstream.as_label()
                    ))
                } else {
                    warn!(target: "gw.services.upstream", upstream = upstream.as_label(), error = %e, "Upstream request failed");
                    record_upstream_request(upstream.as_label(), "error", start.elapsed());
                    GwError::ServiceUnavailable(format!("{} is unavailable", upstream.as_label()))
                }
            })?;

        let status = upstream_response.status();
        let response_headers = forwardable_headers(upstream_response.headers());
        let bytes = upstream_response.bytes().await.map_err(|e| {
            warn!(target: "gw.services.upstream", upstream = upstream.as_label(), error = %e, "Failed to read upstream body");
            record_upstream_request(upstream.as_label(), "error", start.elapsed());
            GwError::ServiceUnavailable(format!("{} is unavailable", upstream.as_label()))
        })?;

        record_upstream_request(upstream.as_label(), status.as_str(), start.elapsed());

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Copy of `headers` without hop-by-hop, identity or deadline headers.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let stripped = HOP_BY_HOP_HEADERS.contains(name)
            || name.as_str() == "keep-alive"
            || name.as_str() == REQUEST_TIMEOUT_HEADER
            || IDENTITY_HEADERS.contains(&name.as_str());
        if !stripped {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn insert_identity(headers: &mut HeaderMap, identity: &Identity) -> Result<(), GwError> {
    let values = [
        (USER_ID_HEADER, identity.subject_id.as_str()),
        (USERNAME_HEADER, identity.username.as_str()),
        (USER_ROLE_HEADER, identity.role.as_str()),
    ];
    for (name, value) in values {
        let value = HeaderValue::from_str(value).map_err(|_| {
            error!(target: "gw.services.upstream", header = name, "Identity value is not a valid header");
            GwError::Internal
        })?;
        headers.insert(name, value);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::Role;

    #[test]
    fn test_forwardable_headers_strips_spoofed_identity() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("someone-else"));
        headers.insert("x-user-role", HeaderValue::from_static("admin"));
        headers.insert("x-username", HeaderValue::from_static("root"));
        headers.insert(REQUEST_TIMEOUT_HEADER, HeaderValue::from_static("999999"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));

        let out = forwardable_headers(&headers);

        assert!(out.get("x-user-id").is_none());
        assert!(out.get("x-user-role").is_none());
        assert!(out.get("x-username").is_none());
        assert!(out.get(REQUEST_TIMEOUT_HEADER).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(out.get(header::AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[test]
    fn test_insert_identity() {
        let mut headers = HeaderMap::new();
        insert_identity(
            &mut headers,
            &Identity {
                subject_id: "u-1".to_string(),
                username: "alice".to_string(),
                role: Role::Admin,
            },
        )
        .unwrap();

        assert_eq!(headers.get(USER_ID_HEADER).unwrap(), "u-1");
        assert_eq!(headers.get(USERNAME_HEADER).unwrap(), "alice");
        assert_eq!(headers.get(USER_ROLE_HEADER).unwrap(), "admin");
    }

    #[test]
    fn test_insert_identity_rejects_control_characters() {
        let mut headers = HeaderMap::new();
        let result = insert_identity(
            &mut headers,
            &Identity {
                subject_id: "u-1".to_string(),
                username: "bad\nname".to_string(),
                role: Role::User,
            },
        );
        assert!(matches!(result, Err(GwError::Internal)));
    }
}
