//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: config + infrastructure wiring (stores, services)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::Extension;
use axum::Router;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::ApiConfig;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: ApiConfig) -> Router {
    let services = Arc::new(services::build_services(config));
    routes::router().layer(Extension(services))
}
