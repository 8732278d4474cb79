use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bondly_core::{ContractId, DomainError, DomainResult, Entity, MilestoneId};

/// Milestone lifecycle. Transitions only move forward; a rejected submission
/// is modeled as a re-submit that overwrites the prior Submitted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Draft,
    Submitted,
    Paid,
}

/// Who triggered the Submitted → Paid transition.
///
/// Recorded so timeout-driven auto-approvals stay distinguishable from
/// explicit human approvals in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovedBy {
    Human,
    Timeout,
}

/// Kind of evidence attached to a milestone submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    File,
    Link,
    Note,
}

/// Append-only evidence record attached at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub id: Uuid,
    pub milestone_id: MilestoneId,
    pub url: String,
    pub kind: ProofKind,
    pub added_at: DateTime<Utc>,
}

impl Proof {
    pub fn new(milestone_id: MilestoneId, url: impl Into<String>, kind: ProofKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            milestone_id,
            url: url.into(),
            kind,
            added_at: Utc::now(),
        }
    }
}

/// A discrete, separately payable unit of work within a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub contract_id: ContractId,
    /// Zero-based order within the contract. Listing queries sort by this,
    /// not by id (UUIDv7 ordering is not guaranteed within a millisecond).
    pub position: u32,
    pub title: String,
    pub description: String,
    /// Amount in smallest currency unit (e.g. cents). Always positive.
    pub amount: i64,
    pub due_at: Option<DateTime<Utc>>,
    pub status: MilestoneStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<ApprovedBy>,
}

impl Entity for Milestone {
    type Id = MilestoneId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Milestone {
    pub fn new(
        contract_id: ContractId,
        position: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        amount: i64,
        due_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("milestone title must not be empty"));
        }
        if amount <= 0 {
            return Err(DomainError::validation(
                "milestone amount must be positive",
            ));
        }
        Ok(Self {
            id: MilestoneId::new(),
            contract_id,
            position,
            title,
            description: description.into(),
            amount,
            due_at,
            status: MilestoneStatus::Draft,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
        })
    }

    /// Mark the milestone submitted at `now`.
    ///
    /// Re-submitting an already-Submitted milestone overwrites `submitted_at`
    /// (there is no rejection state; a rejected claim is simply re-submitted).
    /// A Paid milestone is terminal and cannot be re-submitted.
    pub fn submit(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == MilestoneStatus::Paid {
            return Err(DomainError::invalid_state(
                "cannot submit a milestone that is already paid",
            ));
        }
        self.status = MilestoneStatus::Submitted;
        self.submitted_at = Some(now);
        Ok(())
    }

    /// Approve the milestone: Submitted → Paid.
    ///
    /// Approval and payout-intent are the same transition in this model;
    /// there is no separate "approved-but-unpaid" state.
    pub fn approve(&mut self, now: DateTime<Utc>, by: ApprovedBy) -> DomainResult<()> {
        if self.status != MilestoneStatus::Submitted {
            return Err(DomainError::invalid_state(format!(
                "milestone must be submitted before approval (status: {:?})",
                self.status
            )));
        }
        self.status = MilestoneStatus::Paid;
        self.approved_at = Some(now);
        self.approved_by = Some(by);
        Ok(())
    }

    /// True when the submission has been waiting longer than `threshold`.
    pub fn submitted_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == MilestoneStatus::Submitted
            && self.submitted_at.is_some_and(|at| at < cutoff)
    }
}
