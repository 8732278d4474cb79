use serde::Deserialize;

use bondly_contracts::{MilestoneDraft, ProofKind};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub title: String,
    /// UUIDs as strings. Omitted parties get fresh ids (guest flow).
    pub creator_id: Option<String>,
    pub payer_id: Option<String>,
    pub payee_id: Option<String>,
    /// Registered alongside the contract so approvals can resolve the
    /// payout recipient.
    pub payee_email: Option<String>,
    pub currency: String,
    #[serde(default)]
    pub terms: serde_json::Value,
    pub milestones: Vec<MilestoneDraftRequest>,
    pub total_amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MilestoneDraftRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: i64,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<MilestoneDraftRequest> for MilestoneDraft {
    fn from(r: MilestoneDraftRequest) -> Self {
        MilestoneDraft {
            title: r.title,
            description: r.description,
            amount: r.amount,
            due_at: r.due_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitMilestoneRequest {
    pub milestone_id: String,
    pub proofs: Vec<ProofRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ProofRequest {
    pub url: String,
    #[serde(default = "default_proof_kind")]
    pub kind: ProofKind,
}

fn default_proof_kind() -> ProofKind {
    ProofKind::Link
}

#[derive(Debug, Deserialize)]
pub struct ValidateMilestoneRequest {
    pub milestone_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub problem: String,
    pub city: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<u8>,
    pub has_evidence: Option<bool>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tier: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelJobRequest {
    pub job_id: String,
}
