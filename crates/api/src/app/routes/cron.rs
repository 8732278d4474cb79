use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::app::errors;
use crate::app::services::AppServices;

/// Scheduler-triggered auto-approval sweep, guarded by a shared bearer secret.
pub async fn auto_approve(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let expected = format!("Bearer {}", services.config.cron_secret);
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "bad cron secret");
    }

    match services.sweeper.sweep().await {
        Ok(count) => Json(serde_json::json!({"ok": true, "auto_approved": count})).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
