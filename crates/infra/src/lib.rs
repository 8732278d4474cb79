//! `bondly-infra` — persistence and application services.
//!
//! `store` holds the repository abstractions (`ContractStore`, `EscrowStore`)
//! with an in-memory implementation for tests/dev and a Postgres
//! implementation behind the `postgres` feature. `service` holds the
//! application services that orchestrate the domain model through those
//! traits: contract creation, the milestone submit/approve workflow, deposit
//! recording, webhook processing, and the auto-approval sweep.

pub mod service;
pub mod store;

pub use service::{
    ApprovalOutcome, AutoApprovalSweeper, ContractService, CreateContract, DepositOutcome,
    EscrowService, MilestoneService, WebhookProcessor,
};
pub use store::{in_memory::InMemoryStore, ContractStore, EscrowStore};
#[cfg(feature = "postgres")]
pub use store::postgres::PostgresStore;
