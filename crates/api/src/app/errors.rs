use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bondly_core::DomainError;
use bondly_jobs::JobStoreError;

/// Single mapping from domain errors to HTTP responses.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "message": msg.clone(),
                "issues": [msg],
            })),
        )
            .into_response(),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InvalidState(msg) => json_error(StatusCode::CONFLICT, "invalid_state", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::UpstreamAuth(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_signature", msg)
        }
        DomainError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn job_store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        JobStoreError::InvalidTransition { from } => json_error(
            StatusCode::CONFLICT,
            "invalid_state",
            format!("job is {}", from.as_str()),
        ),
        JobStoreError::Storage(msg) => {
            tracing::error!(error = %msg, "job storage error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
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
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
