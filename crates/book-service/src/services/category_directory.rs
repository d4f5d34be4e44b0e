//! Category directory: answers "does this category exist?".
//!
//! Categories are owned by the category service; this service never caches
//! them. Each check is one `GET /api/v1/categories/{id}`.
//!
//! # Outcome mapping
//!
//! | category service reply           | result                   |
//! |----------------------------------|--------------------------|
//! | 2xx                              | `Ok(true)`               |
//! | 404                              | `Ok(false)`              |
//! | any other status                 | `ServiceUnavailable`     |
//! | connect error, per-call timeout  | `ServiceUnavailable`     |
//! | request deadline exhausted       | `DeadlineExceeded`       |

use crate::errors::BsError;
use crate::models::is_dot_segment;
use async_trait::async_trait;
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

#[async_trait]
pub trait CategoryDirectory: Send + Sync {
    /// Whether category `id` exists, bounded by `deadline`.
    async fn exists(&self, id: &str, deadline: &Deadline) -> Result<bool, BsError>;
}

/// HTTP client for the category service.
#[derive(Clone)]
pub struct HttpCategoryDirectory {
    client: Client,
    base_url: Url,
    per_call_timeout: Duration,
}

impl HttpCategoryDirectory {
    /// # Errors
    ///
    /// Returns `BsError::Internal` if `category_service_url` is not a valid
    /// base URL or the HTTP client cannot be built.
    pub fn new(category_service_url: &str, per_call_timeout: Duration) -> Result<Self, BsError> {
        let base_url = Url::parse(category_service_url).map_err(|e| {
            error!(target: "bs.services.categories", error = %e, "Invalid category service URL");
            BsError::Internal
        })?;
        if base_url.cannot_be_a_base() {
            error!(target: "bs.services.categories", "Category service URL cannot be a base");
            return Err(BsError::Internal);
        }

        let client = Client::builder()
            .connect_timeout(per_call_timeout)
            .build()
            .map_err(|e| {
                error!(target: "bs.services.categories", error = %e, "Failed to build HTTP client");
                BsError::Internal
            })?;

        Ok(Self {
            client,
            base_url,
            per_call_timeout,
        })
    }

    /// `{base}/api/v1/categories/{id}` with `id` percent-encoded as a single
    /// path segment. Dot segments are refused: the URL parser would collapse
    /// them into the category list endpoint.
    fn category_url(&self, id: &str) -> Result<Url, BsError> {
        if is_dot_segment(id) {
            return Err(BsError::Validation(
                "category ids must not be '.' or '..'".to_string(),
            ));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BsError::Internal)?
            .pop_if_empty()
            .extend(["api", "v1", "categories", id]);
        Ok(url)
    }
}

#[async_trait]
impl CategoryDirectory for HttpCategoryDirectory {
    #[instrument(skip_all, name = "bs.categories.exists")]
    async fn exists(&self, id: &str, deadline: &Deadline) -> Result<bool, BsError> {
        if deadline.is_expired() {
            return Err(BsError::DeadlineExceeded(
                "Deadline exhausted before category lookup".to_string(),
            ));
        }

        let response = self
            .client
            .get(self.category_url(id)?)
            .timeout(deadline.budget(self.per_call_timeout))
            .header(REQUEST_TIMEOUT_HEADER, deadline.header_value())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() && deadline.is_expired() {
                    BsError::DeadlineExceeded("Deadline exhausted during category lookup".to_string())
                } else {
                    warn!(target: "bs.services.categories", error = %e, "Category lookup failed");
                    BsError::ServiceUnavailable("Category service is unavailable".to_string())
                }
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => {
                debug!(target: "bs.services.categories", "Category does not exist");
                Ok(false)
            }
            status => {
                warn!(target: "bs.services.categories", status = %status, "Unexpected status from category service");
                Err(BsError::ServiceUnavailable(format!(
                    "Category service returned {status}"
                )))
            }
        }
    }
}

/// Mock category directory for testing.
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Answers from a fixed set of known ids and records every id asked
    /// about, in order.
    pub struct RecordingCategoryDirectory {
        known: HashSet<String>,
        failing: bool,
        lookups: Mutex<Vec<String>>,
    }

    impl RecordingCategoryDirectory {
        /// Directory in which exactly `ids` exist.
        pub fn with_categories<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                known: ids.into_iter().map(Into::into).collect(),
                failing: false,
                lookups: Mutex::new(Vec::new()),
            }
        }

        /// Directory that is always unreachable.
        pub fn failing() -> Self {
            Self {
                known: HashSet::new(),
                failing: true,
                lookups: Mutex::new(Vec::new()),
            }
        }

        /// Ids looked up so far, in call order.
        pub fn lookups(&self) -> Vec<String> {
            self.lookups
                .lock()
                .map(|l| l.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl CategoryDirectory for RecordingCategoryDirectory {
        async fn exists(&self, id: &str, _deadline: &Deadline) -> Result<bool, BsError> {
            if let Ok(mut lookups) = self.lookups.lock() {
                lookups.push(id.to_string());
            }
            if self.failing {
                return Err(BsError::ServiceUnavailable(
                    "Mock category service unavailable".to_string(),
                ));
            }
            Ok(self.known.contains(id))
        }
    }
}
