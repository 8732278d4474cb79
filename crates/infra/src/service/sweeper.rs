use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use bondly_contracts::ApprovedBy;
use bondly_core::DomainResult;

use crate::service::milestones::MilestoneService;
use crate::store::ContractStore;

/// Milestones submitted at least this long ago are approved automatically.
pub const AUTO_APPROVE_AFTER: Duration = Duration::hours(72);

/// Timeout-based approval sweep.
///
/// Runs the same approval routine as a human reviewer, with
/// [`ApprovedBy::Timeout`] provenance. One failing milestone never aborts the
/// sweep; it is logged and skipped.
#[derive(Clone)]
pub struct AutoApprovalSweeper {
    contracts: Arc<dyn ContractStore>,
    milestones: MilestoneService,
}

impl AutoApprovalSweeper {
    pub fn new(contracts: Arc<dyn ContractStore>, milestones: MilestoneService) -> Self {
        Self {
            contracts,
            milestones,
        }
    }

    /// Approve every milestone whose submission has sat unreviewed past the
    /// window. Returns the number approved in this pass.
    pub async fn sweep(&self) -> DomainResult<u64> {
        let cutoff = Utc::now() - AUTO_APPROVE_AFTER;
        let overdue = self.contracts.list_submitted_before(cutoff).await?;

        let mut approved = 0u64;
        for milestone in overdue {
            match self
                .milestones
                .approve(milestone.id, ApprovedBy::Timeout)
                .await
            {
                Ok(_) => approved += 1,
                Err(e) => {
                    warn!(milestone_id = %milestone.id, error = %e, "auto-approval skipped");
                }
            }
        }

        info!(approved, "auto-approval sweep finished");
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::in_memory::InMemoryStore;
    use bondly_contracts::{Contract, Milestone, MilestoneDraft, MilestoneStatus, Proof, ProofKind};
    use bondly_core::UserId;

    async fn seeded(count: usize) -> (Arc<InMemoryStore>, AutoApprovalSweeper, Vec<Milestone>) {
        let store = InMemoryStore::arc();
        let drafts = (0..count)
            .map(|i| MilestoneDraft {
                title: format!("Step {i}"),
                description: String::new(),
                amount: 100_00,
                due_at: None,
            })
            .collect();
        let (contract, milestones) = Contract::create(
            "Swept",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "eur",
            serde_json::Value::Null,
            drafts,
            None,
        )
        .unwrap();
        store.insert_contract(&contract, &milestones).await.unwrap();

        let svc = MilestoneService::new(store.clone(), store.clone());
        let sweeper = AutoApprovalSweeper::new(store.clone(), svc);
        (store, sweeper, milestones)
    }

    async fn submit_at(store: &InMemoryStore, id: bondly_core::MilestoneId, hours_ago: i64) {
        let proof = Proof::new(id, "https://evidence.test/p", ProofKind::Link);
        store
            .submit_milestone(id, vec![proof], Utc::now() - Duration::hours(hours_ago))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sweeps_only_past_the_window() {
        let (store, sweeper, milestones) = seeded(3).await;
        submit_at(&store, milestones[0].id, 73).await;
        submit_at(&store, milestones[1].id, 70).await;
        // milestones[2] stays Draft.

        assert_eq!(sweeper.sweep().await.unwrap(), 1);

        let swept = store.get_milestone(milestones[0].id).await.unwrap().unwrap();
        assert_eq!(swept.status, MilestoneStatus::Paid);
        assert_eq!(swept.approved_by, Some(ApprovedBy::Timeout));

        let fresh = store.get_milestone(milestones[1].id).await.unwrap().unwrap();
        assert_eq!(fresh.status, MilestoneStatus::Submitted);
    }

    #[tokio::test]
    async fn second_sweep_finds_nothing() {
        let (store, sweeper, milestones) = seeded(1).await;
        submit_at(&store, milestones[0].id, 100).await;

        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_of_empty_backlog_is_zero() {
        let (_, sweeper, _) = seeded(2).await;
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn swept_approval_creates_payout_rows() {
        let (store, sweeper, milestones) = seeded(1).await;
        submit_at(&store, milestones[0].id, 80).await;
        sweeper.sweep().await.unwrap();

        use crate::store::EscrowStore;
        let payouts = store.list_payouts(milestones[0].id).await.unwrap();
        assert_eq!(payouts.len(), 1);
    }
}
