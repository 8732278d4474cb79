use std::sync::Arc;

use tracing::info;

use bondly_contracts::{Contract, Milestone, MilestoneDraft};
use bondly_core::{ContractId, DomainError, DomainResult, UserId};

use crate::store::ContractStore;

/// Input for contract creation.
#[derive(Debug, Clone)]
pub struct CreateContract {
    pub title: String,
    pub creator_id: UserId,
    pub payer_id: UserId,
    pub payee_id: UserId,
    /// Registered for the payee once creation succeeds, so approvals can
    /// resolve the payout recipient.
    pub payee_email: Option<String>,
    pub currency: String,
    pub terms: serde_json::Value,
    pub milestones: Vec<MilestoneDraft>,
    pub total_amount: Option<i64>,
}

/// Contract creation and lookup. Contracts are immutable after creation
/// except for status changes driven by the milestone workflow.
#[derive(Clone)]
pub struct ContractService {
    store: Arc<dyn ContractStore>,
}

impl ContractService {
    pub fn new(store: Arc<dyn ContractStore>) -> Self {
        Self { store }
    }

    /// Validate, persist, and (only then) register the payee's email. A
    /// rejected creation leaves no user row behind.
    pub async fn create(&self, input: CreateContract) -> DomainResult<(Contract, Vec<Milestone>)> {
        let (contract, milestones) = Contract::create(
            input.title,
            input.creator_id,
            input.payer_id,
            input.payee_id,
            input.currency,
            input.terms,
            input.milestones,
            input.total_amount,
        )?;

        self.store.insert_contract(&contract, &milestones).await?;

        if let Some(email) = input.payee_email.as_deref() {
            self.store
                .upsert_user_email(contract.payee_id, email)
                .await?;
        }

        info!(
            contract_id = %contract.id,
            slug = %contract.slug,
            total_amount = contract.total_amount,
            milestones = milestones.len(),
            "contract created"
        );
        Ok((contract, milestones))
    }

    pub async fn get(&self, id: ContractId) -> DomainResult<(Contract, Vec<Milestone>)> {
        let contract = self
            .store
            .get_contract(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let milestones = self.store.contract_milestones(id).await?;
        Ok((contract, milestones))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::in_memory::InMemoryStore;

    fn service() -> (ContractService, std::sync::Arc<InMemoryStore>) {
        let store = InMemoryStore::arc();
        (ContractService::new(store.clone()), store)
    }

    fn input() -> CreateContract {
        CreateContract {
            title: "Website redesign".to_string(),
            creator_id: UserId::new(),
            payer_id: UserId::new(),
            payee_id: UserId::new(),
            payee_email: Some("payee@example.test".to_string()),
            currency: "eur".to_string(),
            terms: serde_json::json!({"revisions": 2}),
            milestones: vec![
                MilestoneDraft {
                    title: "Design".to_string(),
                    description: String::new(),
                    amount: 500_00,
                    due_at: None,
                },
                MilestoneDraft {
                    title: "Build".to_string(),
                    description: String::new(),
                    amount: 1500_00,
                    due_at: None,
                },
            ],
            total_amount: None,
        }
    }

    #[tokio::test]
    async fn create_persists_contract_with_milestones() {
        let (svc, store) = service();
        let (created, _) = svc.create(input()).await.unwrap();
        assert_eq!(created.total_amount, 2000_00);

        let (fetched, milestones) = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(milestones.len(), 2);
        assert_eq!(milestones[0].title, "Design");

        let email = store.resolve_payee_email(created.payee_id).await.unwrap();
        assert_eq!(email.as_deref(), Some("payee@example.test"));
    }

    #[tokio::test]
    async fn get_unknown_contract_is_not_found() {
        let (svc, _) = service();
        assert!(matches!(
            svc.get(ContractId::new()).await.unwrap_err(),
            DomainError::NotFound
        ));
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_persisting() {
        let (svc, _) = service();
        let mut bad = input();
        bad.milestones[0].amount = -5;
        assert!(matches!(
            svc.create(bad).await.unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn rejected_create_registers_no_payee_email() {
        let (svc, store) = service();
        let mut bad = input();
        let payee_id = bad.payee_id;
        bad.milestones.clear();

        assert!(svc.create(bad).await.is_err());
        assert!(store
            .resolve_payee_email(payee_id)
            .await
            .unwrap()
            .is_none());
    }
}
