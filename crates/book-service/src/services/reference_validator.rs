//! Referential validator: every category a book names must exist.
//!
//! Ids are checked one at a time in the order given and the first missing
//! id stops the check, so the error always names the earliest offender and
//! later ids cost no lookups. An unreachable category service is reported
//! as such, never as a missing category.

use crate::errors::BsError;
use crate::observability::metrics::record_reference_check;
use crate::services::category_directory::CategoryDirectory;
use common::deadline::Deadline;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

pub struct ReferentialValidator {
    directory: Arc<dyn CategoryDirectory>,
}

impl ReferentialValidator {
    pub fn new(directory: Arc<dyn CategoryDirectory>) -> Self {
        Self { directory }
    }

    /// Confirm every id in `category_ids` exists.
    ///
    /// # Errors
    ///
    /// - `EmptyReferences` if `category_ids` is empty; no lookups are made.
    /// - `ReferenceNotFound(id)` for the first id the directory does not know.
    /// - `ServiceUnavailable` / `DeadlineExceeded` if a lookup cannot complete.
    #[instrument(skip_all, name = "bs.references.validate_all", fields(count = category_ids.len()))]
    pub async fn validate_all(&self, category_ids: &[String], deadline: &Deadline) -> Result<(), BsError> {
        if category_ids.is_empty() {
            return Err(BsError::EmptyReferences);
        }

        for id in category_ids {
            let start = Instant::now();
            match self.directory.exists(id, deadline).await {
                Ok(true) => record_reference_check("exists", start.elapsed()),
                Ok(false) => {
                    record_reference_check("missing", start.elapsed());
                    tracing::debug!(target: "bs.services.references", category_id = %id, "Referenced category does not exist");
                    return Err(BsError::ReferenceNotFound(id.clone()));
                }
                Err(e) => {
                    let result = match e {
                        BsError::DeadlineExceeded(_) => "deadline",
                        _ => "unavailable",
                    };
                    record_reference_check(result, start.elapsed());
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}
