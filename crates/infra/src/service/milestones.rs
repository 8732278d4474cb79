use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bondly_contracts::{ApprovedBy, Contract, ContractStatus, Milestone, Proof, ProofKind};
use bondly_core::{DomainError, DomainResult, MilestoneId};
use bondly_escrow::{payout::UNKNOWN_PAYEE, PayoutLog};

use crate::store::{ContractStore, EscrowStore};

/// Result of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub milestone_id: MilestoneId,
    pub approved_by: ApprovedBy,
    /// True when this approval was the last one and the contract flipped to
    /// Completed.
    pub contract_completed: bool,
}

/// The milestone workflow: submission with evidence, and the single
/// authoritative approval routine.
///
/// Both human approvals and the timeout sweep go through [`approve`], so the
/// full effect set (status transition, contract-completion check, payout-log
/// creation) is identical regardless of trigger.
///
/// [`approve`]: MilestoneService::approve
#[derive(Clone)]
pub struct MilestoneService {
    contracts: Arc<dyn ContractStore>,
    escrow: Arc<dyn EscrowStore>,
}

impl MilestoneService {
    pub fn new(contracts: Arc<dyn ContractStore>, escrow: Arc<dyn EscrowStore>) -> Self {
        Self { contracts, escrow }
    }

    /// Attach proofs and mark the milestone submitted, atomically.
    pub async fn submit(
        &self,
        milestone_id: MilestoneId,
        proofs: Vec<(String, ProofKind)>,
    ) -> DomainResult<Milestone> {
        let proofs: Vec<Proof> = proofs
            .into_iter()
            .map(|(url, kind)| Proof::new(milestone_id, url, kind))
            .collect();

        let milestone = self
            .contracts
            .submit_milestone(milestone_id, proofs, Utc::now())
            .await?;

        info!(milestone_id = %milestone_id, "milestone submitted");
        Ok(milestone)
    }

    /// Approve a submitted milestone: Submitted → Paid, then contract
    /// completion check, then payout-log creation.
    ///
    /// The completion check is read-then-decide: two concurrent approvals of
    /// the last two milestones may both observe "none remaining" and both
    /// write Completed. The write is idempotent, so that is harmless.
    pub async fn approve(
        &self,
        milestone_id: MilestoneId,
        by: ApprovedBy,
    ) -> DomainResult<ApprovalOutcome> {
        let mut milestone = self
            .contracts
            .get_milestone(milestone_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        milestone.approve(Utc::now(), by)?;
        self.contracts.update_milestone(&milestone).await?;

        let siblings = self
            .contracts
            .contract_milestones(milestone.contract_id)
            .await?;
        let contract_completed = Contract::is_complete(&siblings);
        if contract_completed {
            self.contracts
                .set_contract_status(milestone.contract_id, ContractStatus::Completed)
                .await?;
            info!(contract_id = %milestone.contract_id, "contract completed");
        }

        self.record_payout(&milestone).await?;

        info!(
            milestone_id = %milestone_id,
            approved_by = ?by,
            contract_completed,
            "milestone approved"
        );
        Ok(ApprovalOutcome {
            milestone_id,
            approved_by: by,
            contract_completed,
        })
    }

    /// Payout-log creation. An unresolvable payee degrades to the literal
    /// `"unknown"` email instead of failing the approval.
    async fn record_payout(&self, milestone: &Milestone) -> DomainResult<()> {
        let payee_email = match self.contracts.get_contract(milestone.contract_id).await? {
            Some(contract) => match self
                .contracts
                .resolve_payee_email(contract.payee_id)
                .await?
            {
                Some(email) => email,
                None => {
                    warn!(
                        milestone_id = %milestone.id,
                        payee_id = %contract.payee_id,
                        "payee email unresolvable, recording payout with unknown recipient"
                    );
                    UNKNOWN_PAYEE.to_string()
                }
            },
            None => UNKNOWN_PAYEE.to_string(),
        };

        let payout = PayoutLog::pending_manual(milestone.id, payee_email, milestone.amount);
        self.escrow.insert_payout(&payout).await
    }
}
