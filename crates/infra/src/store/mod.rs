//! Repository abstractions over the relational store.
//!
//! The relational store is the single shared mutable resource for contracts,
//! milestones, proofs, escrow batches, and payout logs. Services depend on
//! these traits only; implementations decide how atomicity is provided
//! (a write-lock critical section in memory, transactions in Postgres).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bondly_contracts::{Contract, ContractStatus, Milestone, Proof};
use bondly_core::{ContractId, DomainResult, MilestoneId, UserId};
use bondly_escrow::{EscrowBatch, PayoutLog};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Storage for contracts, their milestones, and submission proofs.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Persist a contract and its milestones as one atomic operation.
    async fn insert_contract(
        &self,
        contract: &Contract,
        milestones: &[Milestone],
    ) -> DomainResult<()>;

    async fn get_contract(&self, id: ContractId) -> DomainResult<Option<Contract>>;

    /// Milestones of a contract, in creation order.
    async fn contract_milestones(&self, id: ContractId) -> DomainResult<Vec<Milestone>>;

    async fn get_milestone(&self, id: MilestoneId) -> DomainResult<Option<Milestone>>;

    /// Append proofs and mark the milestone submitted **atomically**: either
    /// both the proof rows and the status update are applied, or neither is.
    /// Fails with `NotFound` for an unknown milestone and `InvalidState` for
    /// a paid one; validation failures leave the milestone untouched.
    async fn submit_milestone(
        &self,
        id: MilestoneId,
        proofs: Vec<Proof>,
        now: DateTime<Utc>,
    ) -> DomainResult<Milestone>;

    /// Overwrite a milestone row (status/timestamps). `NotFound` if unknown.
    async fn update_milestone(&self, milestone: &Milestone) -> DomainResult<()>;

    /// Proofs attached to a milestone, in append order.
    async fn milestone_proofs(&self, id: MilestoneId) -> DomainResult<Vec<Proof>>;

    /// Milestones sitting in Submitted with `submitted_at` strictly before
    /// the cutoff (auto-approval sweep input).
    async fn list_submitted_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Milestone>>;

    /// Idempotent status write; setting Completed twice is harmless.
    async fn set_contract_status(
        &self,
        id: ContractId,
        status: ContractStatus,
    ) -> DomainResult<()>;

    /// Payee email lookup. `None` when the user record cannot be resolved.
    async fn resolve_payee_email(&self, user_id: UserId) -> DomainResult<Option<String>>;

    /// Seed/update a user's email (dev and test fixture path).
    async fn upsert_user_email(&self, user_id: UserId, email: &str) -> DomainResult<()>;
}

/// Storage for the escrow ledger and payout obligations.
#[async_trait]
pub trait EscrowStore: Send + Sync {
    /// Insert one confirmed deposit. Implementations enforce uniqueness of
    /// `payment_intent_id` and answer `Conflict` on a duplicate.
    async fn insert_batch(&self, batch: &EscrowBatch) -> DomainResult<()>;

    async fn find_batch_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> DomainResult<Option<EscrowBatch>>;

    /// Batches recorded for a contract, oldest first.
    async fn list_batches(&self, contract_id: ContractId) -> DomainResult<Vec<EscrowBatch>>;

    async fn insert_payout(&self, payout: &PayoutLog) -> DomainResult<()>;

    async fn list_payouts(&self, milestone_id: MilestoneId) -> DomainResult<Vec<PayoutLog>>;
}
