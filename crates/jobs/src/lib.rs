//! Async job queue backing the legal-audit pipeline.
//!
//! ## Design
//!
//! - Jobs are tracked by id, status, and an append-only event/artifact trail
//! - The pipeline executor lives outside this crate; it reports step-level
//!   progress through `append_event` and outputs through `add_artifact`
//! - Cancellation is advisory: it marks the record, nothing is signaled to
//!   in-flight work, and a late completion write may still land afterwards
//! - `JobStore` is the injectable seam; the in-memory implementation is
//!   process-lifetime and non-persistent (single instance, data lost on
//!   restart) — a durable store must implement the same trait for production
//!
//! ## Components
//!
//! - `JobRecord` / `JobEventRecord` / `ArtifactRecord`: queue data model
//! - `JobStore`: storage abstraction (enqueue/get/update/events/artifacts)
//! - `PipelineSteps`: configured step list used for progress estimation

pub mod store;
pub mod types;

pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use types::{
    ArtifactKind, ArtifactRecord, EventStatus, JobEventRecord, JobPatch, JobRecord, JobStatus,
    PipelineSteps,
};
