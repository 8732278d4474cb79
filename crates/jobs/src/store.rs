//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use bondly_core::JobId;

use super::types::{
    ArtifactKind, ArtifactRecord, EventStatus, JobEventRecord, JobPatch, JobRecord, JobStatus,
};

/// Job store abstraction.
///
/// Jobs are addressable only by job id; events and artifacts are append-only
/// per job. Implementations must keep `update` bumping `updated_at` on every
/// applied patch.
pub trait JobStore: Send + Sync {
    /// Enqueue a new job.
    ///
    /// When the job carries an idempotency key and a live (non-terminal) job
    /// already holds that key, the existing job's id is returned and no new
    /// record is created.
    fn enqueue(&self, job: JobRecord) -> Result<JobId, JobStoreError>;

    /// Get a job by id.
    fn get(&self, job_id: JobId) -> Result<Option<JobRecord>, JobStoreError>;

    /// Apply a patch to a job. Returns the updated record, or `None` for an
    /// unknown id (a deliberate no-op, not an error).
    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Option<JobRecord>, JobStoreError>;

    /// Cancel a job. Only permitted while the status is cancelable
    /// (queued/processing/partial); otherwise `InvalidTransition`.
    fn cancel(&self, job_id: JobId) -> Result<JobRecord, JobStoreError>;

    /// Append a step-level event to the job's audit trail.
    fn append_event(
        &self,
        job_id: JobId,
        step: &str,
        status: EventStatus,
        log: Option<String>,
        meta: Option<serde_json::Value>,
    ) -> Result<JobEventRecord, JobStoreError>;

    /// Events for a job, in append order.
    fn list_events(&self, job_id: JobId) -> Result<Vec<JobEventRecord>, JobStoreError>;

    /// Record a produced artifact.
    fn add_artifact(
        &self,
        job_id: JobId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<ArtifactRecord, JobStoreError>;

    /// Artifacts for a job, in append order.
    fn list_artifacts(&self, job_id: JobId) -> Result<Vec<ArtifactRecord>, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("invalid transition: job is {from:?}")]
    InvalidTransition { from: JobStatus },
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store.
///
/// Process-lifetime and non-persistent: records are lost on restart and not
/// shared across instances. Suitable for tests, dev, and single-instance
/// deployments that accept those limits.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    events: RwLock<HashMap<JobId, Vec<JobEventRecord>>>,
    artifacts: RwLock<HashMap<JobId, Vec<ArtifactRecord>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: JobRecord) -> Result<JobId, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();

        if let Some(key) = job.idempotency_key.as_deref() {
            let existing = jobs
                .values()
                .filter(|j| j.idempotency_key.as_deref() == Some(key) && !j.status.is_terminal())
                .max_by_key(|j| j.created_at);
            if let Some(existing) = existing {
                return Ok(existing.id);
            }
        }

        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        Ok(self.jobs.read().unwrap().get(&job_id).cloned())
    }

    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Option<JobRecord>, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(result) = patch.result {
            job.result = Some(result);
        }
        if let Some(started_at) = patch.started_at {
            job.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            job.completed_at = Some(completed_at);
        }
        job.updated_at = Utc::now();

        Ok(Some(job.clone()))
    }

    fn cancel(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound(job_id))?;

        if !job.status.is_cancelable() {
            return Err(JobStoreError::InvalidTransition { from: job.status });
        }

        job.status = JobStatus::Canceled;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    fn append_event(
        &self,
        job_id: JobId,
        step: &str,
        status: EventStatus,
        log: Option<String>,
        meta: Option<serde_json::Value>,
    ) -> Result<JobEventRecord, JobStoreError> {
        if !self.jobs.read().unwrap().contains_key(&job_id) {
            return Err(JobStoreError::NotFound(job_id));
        }

        let event = JobEventRecord {
            id: Uuid::now_v7(),
            job_id,
            step: step.to_string(),
            status,
            log,
            meta,
            ts: Utc::now(),
        };

        self.events
            .write()
            .unwrap()
            .entry(job_id)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    fn list_events(&self, job_id: JobId) -> Result<Vec<JobEventRecord>, JobStoreError> {
        Ok(self
            .events
            .read()
            .unwrap()
            .get(&job_id)
            .cloned()
            .unwrap_or_default())
    }

    fn add_artifact(
        &self,
        job_id: JobId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<ArtifactRecord, JobStoreError> {
        if !self.jobs.read().unwrap().contains_key(&job_id) {
            return Err(JobStoreError::NotFound(job_id));
        }

        let artifact = ArtifactRecord {
            id: Uuid::now_v7(),
            job_id,
            kind,
            url: url.to_string(),
            ts: Utc::now(),
        };

        self.artifacts
            .write()
            .unwrap()
            .entry(job_id)
            .or_default()
            .push(artifact.clone());
        Ok(artifact)
    }

    fn list_artifacts(&self, job_id: JobId) -> Result<Vec<ArtifactRecord>, JobStoreError> {
        Ok(self
            .artifacts
            .read()
            .unwrap()
            .get(&job_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn enqueue(&self, job: JobRecord) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        (**self).get(job_id)
    }

    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Option<JobRecord>, JobStoreError> {
        (**self).update(job_id, patch)
    }

    fn cancel(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        (**self).cancel(job_id)
    }

    fn append_event(
        &self,
        job_id: JobId,
        step: &str,
        status: EventStatus,
        log: Option<String>,
        meta: Option<serde_json::Value>,
    ) -> Result<JobEventRecord, JobStoreError> {
        (**self).append_event(job_id, step, status, log, meta)
    }

    fn list_events(&self, job_id: JobId) -> Result<Vec<JobEventRecord>, JobStoreError> {
        (**self).list_events(job_id)
    }

    fn add_artifact(
        &self,
        job_id: JobId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<ArtifactRecord, JobStoreError> {
        (**self).add_artifact(job_id, kind, url)
    }

    fn list_artifacts(&self, job_id: JobId) -> Result<Vec<ArtifactRecord>, JobStoreError> {
        (**self).list_artifacts(job_id)
    }
}
