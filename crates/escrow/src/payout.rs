use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bondly_core::MilestoneId;

/// Email placeholder used when the payee record cannot be resolved.
/// A deliberate non-fatal degradation: the obligation is still recorded.
pub const UNKNOWN_PAYEE: &str = "unknown";

/// An amount owed to a payee following milestone approval.
///
/// This is an obligation record, not a completed transfer: payout execution
/// is a manual ops step in this design, so `method` stays `"manual"` and
/// `status` starts as `"pending"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLog {
    pub id: Uuid,
    pub milestone_id: MilestoneId,
    pub payee_email: String,
    /// Amount in smallest currency unit.
    pub amount: i64,
    pub method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl PayoutLog {
    pub fn pending_manual(
        milestone_id: MilestoneId,
        payee_email: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            milestone_id,
            payee_email: payee_email.into(),
            amount,
            method: "manual".to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }
}
