//! In-memory store for tests/dev.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bondly_contracts::{Contract, ContractStatus, Milestone, Proof};
use bondly_core::{ContractId, DomainError, DomainResult, MilestoneId, UserId};
use bondly_escrow::{EscrowBatch, PayoutLog};

use super::{ContractStore, EscrowStore};

/// RwLock-backed implementation of both store traits.
///
/// Atomicity comes from doing each multi-row mutation inside a single write
/// critical section.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contracts: RwLock<HashMap<ContractId, Contract>>,
    milestones: RwLock<HashMap<MilestoneId, Milestone>>,
    proofs: RwLock<HashMap<MilestoneId, Vec<Proof>>>,
    users: RwLock<HashMap<UserId, String>>,
    batches: RwLock<Vec<EscrowBatch>>,
    payouts: RwLock<Vec<PayoutLog>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

fn poisoned<T>(_: T) -> DomainError {
    DomainError::internal("store lock poisoned")
}

#[async_trait]
impl ContractStore for InMemoryStore {
    async fn insert_contract(
        &self,
        contract: &Contract,
        milestones: &[Milestone],
    ) -> DomainResult<()> {
        let mut contracts = self.contracts.write().map_err(poisoned)?;
        let mut stored = self.milestones.write().map_err(poisoned)?;

        if contracts.contains_key(&contract.id) {
            return Err(DomainError::conflict("contract already exists"));
        }
        contracts.insert(contract.id, contract.clone());
        for milestone in milestones {
            stored.insert(milestone.id, milestone.clone());
        }
        Ok(())
    }

    async fn get_contract(&self, id: ContractId) -> DomainResult<Option<Contract>> {
        Ok(self.contracts.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn contract_milestones(&self, id: ContractId) -> DomainResult<Vec<Milestone>> {
        let milestones = self.milestones.read().map_err(poisoned)?;
        let mut result: Vec<Milestone> = milestones
            .values()
            .filter(|m| m.contract_id == id)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.position);
        Ok(result)
    }

    async fn get_milestone(&self, id: MilestoneId) -> DomainResult<Option<Milestone>> {
        Ok(self.milestones.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn submit_milestone(
        &self,
        id: MilestoneId,
        proofs: Vec<Proof>,
        now: DateTime<Utc>,
    ) -> DomainResult<Milestone> {
        // Validate everything before touching state: a rejected proof must
        // not leave the milestone half-submitted.
        for proof in &proofs {
            if proof.url.trim().is_empty() {
                return Err(DomainError::validation("proof url must not be empty"));
            }
            if proof.milestone_id != id {
                return Err(DomainError::validation("proof references another milestone"));
            }
        }

        let mut milestones = self.milestones.write().map_err(poisoned)?;
        let mut proof_map = self.proofs.write().map_err(poisoned)?;

        let milestone = milestones.get_mut(&id).ok_or(DomainError::NotFound)?;
        milestone.submit(now)?;
        proof_map.entry(id).or_default().extend(proofs);
        Ok(milestone.clone())
    }

    async fn update_milestone(&self, milestone: &Milestone) -> DomainResult<()> {
        let mut milestones = self.milestones.write().map_err(poisoned)?;
        if !milestones.contains_key(&milestone.id) {
            return Err(DomainError::NotFound);
        }
        milestones.insert(milestone.id, milestone.clone());
        Ok(())
    }

    async fn milestone_proofs(&self, id: MilestoneId) -> DomainResult<Vec<Proof>> {
        Ok(self
            .proofs
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_submitted_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Milestone>> {
        let milestones = self.milestones.read().map_err(poisoned)?;
        let mut result: Vec<Milestone> = milestones
            .values()
            .filter(|m| m.submitted_before(cutoff))
            .cloned()
            .collect();
        result.sort_by_key(|m| m.submitted_at);
        Ok(result)
    }

    async fn set_contract_status(
        &self,
        id: ContractId,
        status: ContractStatus,
    ) -> DomainResult<()> {
        let mut contracts = self.contracts.write().map_err(poisoned)?;
        let contract = contracts.get_mut(&id).ok_or(DomainError::NotFound)?;
        contract.status = status;
        Ok(())
    }

    async fn resolve_payee_email(&self, user_id: UserId) -> DomainResult<Option<String>> {
        Ok(self.users.read().map_err(poisoned)?.get(&user_id).cloned())
    }

    async fn upsert_user_email(&self, user_id: UserId, email: &str) -> DomainResult<()> {
        self.users
            .write()
            .map_err(poisoned)?
            .insert(user_id, email.to_string());
        Ok(())
    }
}

#[async_trait]
impl EscrowStore for InMemoryStore {
    async fn insert_batch(&self, batch: &EscrowBatch) -> DomainResult<()> {
        let mut batches = self.batches.write().map_err(poisoned)?;
        if batches
            .iter()
            .any(|b| b.payment_intent_id == batch.payment_intent_id)
        {
            return Err(DomainError::conflict(format!(
                "escrow batch already recorded for payment intent {}",
                batch.payment_intent_id
            )));
        }
        batches.push(batch.clone());
        Ok(())
    }

    async fn find_batch_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> DomainResult<Option<EscrowBatch>> {
        Ok(self
            .batches
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|b| b.payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn list_batches(&self, contract_id: ContractId) -> DomainResult<Vec<EscrowBatch>> {
        Ok(self
            .batches
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|b| b.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn insert_payout(&self, payout: &PayoutLog) -> DomainResult<()> {
        self.payouts.write().map_err(poisoned)?.push(payout.clone());
        Ok(())
    }

    async fn list_payouts(&self, milestone_id: MilestoneId) -> DomainResult<Vec<PayoutLog>> {
        Ok(self
            .payouts
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|p| p.milestone_id == milestone_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondly_contracts::{MilestoneDraft, MilestoneStatus, ProofKind};

    fn fixture() -> (Contract, Vec<Milestone>) {
        Contract::create(
            "Fixture",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "eur",
            serde_json::Value::Null,
            vec![MilestoneDraft {
                title: "Only".to_string(),
                description: String::new(),
                amount: 100_00,
                due_at: None,
            }],
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn contract_milestones_come_back_in_draft_order() {
        let store = InMemoryStore::new();
        let drafts = (0..10)
            .map(|i| MilestoneDraft {
                title: format!("Step {i}"),
                description: String::new(),
                amount: 100_00,
                due_at: None,
            })
            .collect();
        let (contract, milestones) = Contract::create(
            "Ordered",
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

        let listed = store.contract_milestones(contract.id).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|m| m.title.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("Step {i}")).collect();
        assert_eq!(titles, expected);
    }

    #[tokio::test]
    async fn submit_applies_proofs_and_status_together() {
        let store = InMemoryStore::new();
        let (contract, milestones) = fixture();
        store.insert_contract(&contract, &milestones).await.unwrap();

        let id = milestones[0].id;
        let proofs = vec![Proof::new(id, "https://evidence.test/a", ProofKind::Link)];
        let updated = store.submit_milestone(id, proofs, Utc::now()).await.unwrap();

        assert_eq!(updated.status, MilestoneStatus::Submitted);
        assert_eq!(store.milestone_proofs(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_submit_leaves_milestone_and_proofs_untouched() {
        let store = InMemoryStore::new();
        let (contract, milestones) = fixture();
        store.insert_contract(&contract, &milestones).await.unwrap();

        let id = milestones[0].id;
        let bad = vec![
            Proof::new(id, "https://evidence.test/a", ProofKind::Link),
            Proof::new(id, "   ", ProofKind::Note),
        ];
        let err = store.submit_milestone(id, bad, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let milestone = store.get_milestone(id).await.unwrap().unwrap();
        assert_eq!(milestone.status, MilestoneStatus::Draft);
        assert!(store.milestone_proofs(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_unknown_milestone_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .submit_milestone(MilestoneId::new(), vec![], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_batch_insert_conflicts() {
        let store = InMemoryStore::new();
        let contract_id = ContractId::new();
        let batch = EscrowBatch::new(contract_id, 100, "eur", "pi_1", None);
        store.insert_batch(&batch).await.unwrap();

        let dup = EscrowBatch::new(contract_id, 100, "eur", "pi_1", None);
        assert!(matches!(
            store.insert_batch(&dup).await.unwrap_err(),
            DomainError::Conflict(_)
        ));
        assert_eq!(store.list_batches(contract_id).await.unwrap().len(), 1);
    }
}
