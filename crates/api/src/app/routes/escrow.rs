use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use bondly_contracts::ApprovedBy;
use bondly_core::MilestoneId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn submit_milestone(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitMilestoneRequest>,
) -> axum::response::Response {
    let milestone_id: MilestoneId = match body.milestone_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid milestone id")
        }
    };

    let proofs = body
        .proofs
        .into_iter()
        .map(|p| (p.url, p.kind))
        .collect();

    match services.milestones.submit(milestone_id, proofs).await {
        Ok(_) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn validate_milestone(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ValidateMilestoneRequest>,
) -> axum::response::Response {
    let milestone_id: MilestoneId = match body.milestone_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid milestone id")
        }
    };

    match services.milestones.approve(milestone_id, ApprovedBy::Human).await {
        Ok(_) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
