use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::app::errors;
use crate::app::services::AppServices;

/// Payment-provider delivery endpoint.
///
/// Signature verification runs against the raw body bytes; the JSON is only
/// parsed afterwards. Post-authentication failures are acknowledged with 200
/// so the provider does not retry events we can never process.
pub async fn stripe_webhook(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_signature",
            "missing stripe-signature header",
        );
    };

    match services.webhook.process(&body, signature).await {
        Ok(()) => Json(serde_json::json!({"received": true})).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
