use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bondly_core::ContractId;

/// One confirmed deposit into platform-held escrow.
///
/// Keyed by the payment provider's transaction id (`payment_intent_id`),
/// which is the natural idempotency boundary: the ledger must hold exactly
/// one batch per provider transaction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBatch {
    pub id: Uuid,
    pub contract_id: ContractId,
    /// Amount in smallest currency unit.
    pub amount: i64,
    pub currency: String,
    /// Provider transaction id — the natural idempotency key.
    pub payment_intent_id: String,
    pub charge_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl EscrowBatch {
    pub fn new(
        contract_id: ContractId,
        amount: i64,
        currency: impl Into<String>,
        payment_intent_id: impl Into<String>,
        charge_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            contract_id,
            amount,
            currency: currency.into(),
            payment_intent_id: payment_intent_id.into(),
            charge_id,
            received_at: Utc::now(),
        }
    }
}
