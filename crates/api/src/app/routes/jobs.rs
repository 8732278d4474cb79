use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use bondly_core::JobId;
use bondly_jobs::{EventStatus, JobRecord, JobStatus, JobStore, JobStoreError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const MIN_PROBLEM_CHARS: usize = 20;

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    if !services.config.async_jobs_enabled {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "async_disabled",
            "async job processing is disabled",
        );
    }

    if body.problem.trim().chars().count() < MIN_PROBLEM_CHARS {
        return errors::domain_error_to_response(bondly_core::DomainError::validation(format!(
            "problem must be at least {MIN_PROBLEM_CHARS} characters"
        )));
    }

    let payload = serde_json::json!({
        "problem": body.problem,
        "city": body.city,
        "category": body.category,
        "urgency": body.urgency,
        "has_evidence": body.has_evidence,
        "email": body.email,
        "phone": body.phone,
    });

    let mut job = JobRecord::new("legal_audit", payload);
    if let Some(tier) = body.tier {
        job = job.with_tier(tier);
    }
    if let Some(key) = body.idempotency_key {
        job = job.with_idempotency_key(key);
    }

    match services.jobs.enqueue(job) {
        Ok(job_id) => Json(serde_json::json!({
            "job_id": job_id.to_string(),
            "status": "queued",
        }))
        .into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct JobIdParams {
    pub id: String,
}

pub async fn job_status(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<JobIdParams>,
) -> axum::response::Response {
    let job_id: JobId = match params.id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let job = match services.jobs.get(job_id) {
        Ok(Some(job)) => job,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        Err(e) => return errors::job_store_error_to_response(e),
    };

    let events = match services.jobs.list_events(job_id) {
        Ok(events) => events,
        Err(e) => return errors::job_store_error_to_response(e),
    };

    let step = events.last().map(|e| e.step.clone());
    let succeeded = events
        .iter()
        .filter(|e| e.status == EventStatus::Succeeded)
        .count();
    let progress = services.pipeline.progress_percent(succeeded);

    Json(serde_json::json!({
        "job_id": job.id.to_string(),
        "status": job.status.as_str(),
        "step": step,
        "progress": progress,
        "updated_at": job.updated_at,
    }))
    .into_response()
}

pub async fn job_result(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<JobIdParams>,
) -> axum::response::Response {
    let job_id: JobId = match params.id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let job = match services.jobs.get(job_id) {
        Ok(Some(job)) => job,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        Err(e) => return errors::job_store_error_to_response(e),
    };

    let artifacts = match services.jobs.list_artifacts(job_id) {
        Ok(artifacts) => artifacts,
        Err(e) => return errors::job_store_error_to_response(e),
    };
    let artifacts: Vec<serde_json::Value> = artifacts
        .iter()
        .map(|a| serde_json::json!({"kind": a.kind, "url": a.url}))
        .collect();

    Json(serde_json::json!({
        "success": job.status == JobStatus::Completed,
        "analysis": job.result,
        "artifacts": artifacts,
        "status": job.status.as_str(),
    }))
    .into_response()
}

pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CancelJobRequest>,
) -> axum::response::Response {
    let Ok(job_id) = body.job_id.parse::<JobId>() else {
        return Json(serde_json::json!({"success": false, "error": "invalid_id"})).into_response();
    };

    match services.jobs.cancel(job_id) {
        Ok(_) => Json(serde_json::json!({"success": true})).into_response(),
        Err(JobStoreError::NotFound(_)) => {
            Json(serde_json::json!({"success": false, "error": "not_found"})).into_response()
        }
        Err(JobStoreError::InvalidTransition { .. }) => {
            Json(serde_json::json!({"success": false, "error": "invalid_state"})).into_response()
        }
        Err(e) => errors::job_store_error_to_response(e),
    }
}
