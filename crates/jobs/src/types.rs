//! Core job queue types and progress estimation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bondly_core::{JobId, UserId};

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up
    Queued,
    /// Currently being executed
    Processing,
    /// Some steps succeeded, some failed; output may be usable
    Partial,
    /// Completed successfully
    Completed,
    /// Failed terminally
    Failed,
    /// Canceled by the caller (advisory; see crate docs)
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Cancellation is only permitted before the job reaches a terminal state.
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            JobStatus::Queued | JobStatus::Processing | JobStatus::Partial
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Partial => "partial",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

/// A tracked asynchronous unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Job type for routing (e.g. `"legal_audit"`).
    pub job_type: String,
    pub status: JobStatus,
    /// JSON payload handed to the executor.
    pub payload: serde_json::Value,
    /// Final output written by the executor.
    pub result: Option<serde_json::Value>,
    pub tier: Option<String>,
    pub user_id: Option<UserId>,
    /// Stored and honored: enqueue returns the existing live job for a
    /// matching key instead of creating a duplicate.
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            status: JobStatus::Queued,
            payload,
            result: None,
            tier: None,
            user_id: None,
            idempotency_key: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Partial update applied through `JobStore::update`.
///
/// Unset fields are left untouched; `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub result: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Per-step outcome reported by the pipeline executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Started,
    Succeeded,
    Failed,
    Skipped,
}

/// Append-only audit trail entry for one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEventRecord {
    pub id: Uuid,
    pub job_id: JobId,
    pub step: String,
    pub status: EventStatus,
    pub log: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub ts: DateTime<Utc>,
}

/// Kind of output artifact produced by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Pdf,
    Json,
    Html,
}

/// Append-only record of a produced output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: Uuid,
    pub job_id: JobId,
    pub kind: ArtifactKind,
    pub url: String,
    pub ts: DateTime<Utc>,
}

/// Ordered pipeline step names, used for progress estimation.
///
/// The default is the legal-audit pipeline. The percentage derived from it is
/// an approximation (succeeded events over configured steps), not an exact
/// measure of remaining work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSteps(Vec<String>);

/// Fallback step count when no pipeline is configured.
pub const DEFAULT_STEP_COUNT: usize = 7;

impl Default for PipelineSteps {
    fn default() -> Self {
        Self(
            [
                "intake",
                "classification",
                "jurisdiction_research",
                "precedent_search",
                "risk_analysis",
                "recommendations",
                "report_render",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }
}

impl PipelineSteps {
    pub fn new(steps: Vec<String>) -> Self {
        Self(steps)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn total(&self) -> usize {
        if self.0.is_empty() {
            DEFAULT_STEP_COUNT
        } else {
            self.0.len()
        }
    }

    /// `min(100, round(succeeded / total * 100))`.
    pub fn progress_percent(&self, succeeded_events: usize) -> u8 {
        let total = self.total();
        let pct = (succeeded_events as f64 / total as f64 * 100.0).round() as u64;
        pct.min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_has_seven_steps() {
        let steps = PipelineSteps::default();
        assert_eq!(steps.total(), DEFAULT_STEP_COUNT);
    }

    #[test]
    fn empty_pipeline_falls_back_to_default_count() {
        let steps = PipelineSteps::new(vec![]);
        assert_eq!(steps.total(), DEFAULT_STEP_COUNT);
    }

    #[test]
    fn progress_rounds_and_caps() {
        let steps = PipelineSteps::default();
        assert_eq!(steps.progress_percent(0), 0);
        assert_eq!(steps.progress_percent(1), 14);
        assert_eq!(steps.progress_percent(3), 43);
        assert_eq!(steps.progress_percent(7), 100);
        // More succeeded events than configured steps still caps at 100.
        assert_eq!(steps.progress_percent(12), 100);
    }

    #[test]
    fn cancelable_statuses() {
        assert!(JobStatus::Queued.is_cancelable());
        assert!(JobStatus::Processing.is_cancelable());
        assert!(JobStatus::Partial.is_cancelable());
        assert!(!JobStatus::Completed.is_cancelable());
        assert!(!JobStatus::Failed.is_cancelable());
        assert!(!JobStatus::Canceled.is_cancelable());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let job = JobRecord::new("legal_audit", serde_json::json!({"problem": "x"}))
            .with_tier("premium")
            .with_idempotency_key("key-1");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.tier.as_deref(), Some("premium"));
        assert_eq!(job.idempotency_key.as_deref(), Some("key-1"));
        assert!(job.started_at.is_none());
    }
}
