//! Current user endpoint.

use axum::{Extension, Json};
use common::types::Identity;
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject_id: String,
    pub username: String,
    pub role: String,
}

/// Handler for GET /api/v1/me
///
/// Returns the identity attached by the session gate. Answered by the
/// gateway without another call to the user service.
#[instrument(skip_all, name = "gw.handlers.me")]
pub async fn get_me(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse {
        subject_id: identity.subject_id,
        username: identity.username,
        role: identity.role.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::Role;

    #[tokio::test]
    async fn test_get_me_echoes_identity() {
        let Json(me) = get_me(Extension(Identity {
            subject_id: "u-7".to_string(),
            username: "grace".to_string(),
            role: Role::Admin,
        }))
        .await;

        let json = serde_json::to_value(&me).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"subject_id": "u-7", "username": "grace", "role": "admin"})
        );
    }
}
