use std::sync::Arc;

use tracing::info;

use bondly_core::{ContractId, DomainError, DomainResult};
use bondly_escrow::{DepositNotice, EscrowBatch};

use crate::store::{ContractStore, EscrowStore};

/// How a deposit notice was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    /// A new ledger row was written.
    Recorded,
    /// The payment intent was already on the ledger. No row was written.
    Duplicate,
}

/// The escrow ledger. Deposits are keyed by payment intent id, so provider
/// redeliveries of the same event never double-count funds.
#[derive(Clone)]
pub struct EscrowService {
    contracts: Arc<dyn ContractStore>,
    escrow: Arc<dyn EscrowStore>,
}

impl EscrowService {
    pub fn new(contracts: Arc<dyn ContractStore>, escrow: Arc<dyn EscrowStore>) -> Self {
        Self { contracts, escrow }
    }

    /// Record a confirmed deposit, once.
    ///
    /// Lookup-then-insert on its own would race with a concurrent delivery of
    /// the same event, so a Conflict from the store (unique payment intent)
    /// is also folded into `Duplicate`.
    pub async fn record_deposit(&self, notice: DepositNotice) -> DomainResult<DepositOutcome> {
        if self
            .contracts
            .get_contract(notice.contract_id)
            .await?
            .is_none()
        {
            return Err(DomainError::NotFound);
        }

        if self
            .escrow
            .find_batch_by_payment_intent(&notice.payment_intent_id)
            .await?
            .is_some()
        {
            info!(
                payment_intent_id = %notice.payment_intent_id,
                "deposit already recorded, skipping"
            );
            return Ok(DepositOutcome::Duplicate);
        }

        let batch = EscrowBatch::new(
            notice.contract_id,
            notice.amount,
            notice.currency.clone(),
            notice.payment_intent_id.clone(),
            notice.charge_id.clone(),
        );
        match self.escrow.insert_batch(&batch).await {
            Ok(()) => {
                info!(
                    contract_id = %notice.contract_id,
                    payment_intent_id = %notice.payment_intent_id,
                    amount = notice.amount,
                    "deposit recorded"
                );
                Ok(DepositOutcome::Recorded)
            }
            Err(DomainError::Conflict(_)) => Ok(DepositOutcome::Duplicate),
            Err(e) => Err(e),
        }
    }

    pub async fn deposits(&self, contract_id: ContractId) -> DomainResult<Vec<EscrowBatch>> {
        self.escrow.list_batches(contract_id).await
    }
}
