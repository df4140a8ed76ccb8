use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use usersync_infra::{PrimaryStoreError, SyncError};

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    match err {
        SyncError::Validation(e) => json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        SyncError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "User not found in primary store"),
        SyncError::Primary(e @ PrimaryStoreError::DuplicateKey { .. }) => {
            tracing::warn!(error = %e, "rejected duplicate registration");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "duplicate_key", e.to_string())
        }
        SyncError::Primary(e) => {
            tracing::error!(error = %e, "primary store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "primary_store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
