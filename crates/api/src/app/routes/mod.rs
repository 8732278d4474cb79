use axum::{
    routing::{get, post},
    Router,
};

pub mod contracts;
pub mod cron;
pub mod escrow;
pub mod jobs;
pub mod system;
pub mod webhook;

/// Full routing tree.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/contracts/create", post(contracts::create_contract))
        .route("/contracts/:id", get(contracts::get_contract))
        .route("/escrow/milestone/submit", post(escrow::submit_milestone))
        .route("/escrow/milestone/validate", post(escrow::validate_milestone))
        .route("/escrow/stripe-webhook", post(webhook::stripe_webhook))
        .route("/cron/auto-approve", post(cron::auto_approve))
        .route("/conseiller/jobs/create", post(jobs::create_job))
        .route("/conseiller/jobs/status", get(jobs::job_status))
        .route("/conseiller/jobs/result", get(jobs::job_result))
        .route("/conseiller/jobs/cancel", post(jobs::cancel_job))
}
