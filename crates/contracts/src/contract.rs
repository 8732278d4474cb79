use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bondly_core::{ContractId, DomainError, DomainResult, Entity, UserId};

use crate::milestone::{Milestone, MilestoneStatus};

/// Contract lifecycle: transitions Active → Completed exactly once, when the
/// last milestone reaches Paid. Contracts are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Completed,
}

/// Caller-supplied milestone definition used at contract creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub title: String,
    pub description: String,
    /// Amount in smallest currency unit. Must be positive.
    pub amount: i64,
    pub due_at: Option<DateTime<Utc>>,
}

/// Aggregate root: an escrow contract and its milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// URL-friendly identifier: time-based prefix + random suffix.
    /// Best-effort uniqueness, not a hard guarantee.
    pub slug: String,
    pub title: String,
    pub creator_id: UserId,
    pub payer_id: UserId,
    pub payee_id: UserId,
    /// ISO 4217 currency code, lowercase.
    pub currency: String,
    /// Total in smallest currency unit. Frozen at creation: either the
    /// caller-supplied value or the sum of milestone amounts.
    pub total_amount: i64,
    /// Opaque structured terms.
    pub terms: serde_json::Value,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Contract {
    type Id = ContractId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Contract {
    /// Validate inputs and build a contract plus its milestones.
    ///
    /// When `total_amount` is omitted it is computed as the checked sum of the
    /// milestone amounts. The persistence layer must store the contract and
    /// milestones as one atomic operation.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        title: impl Into<String>,
        creator_id: UserId,
        payer_id: UserId,
        payee_id: UserId,
        currency: impl Into<String>,
        terms: serde_json::Value,
        drafts: Vec<MilestoneDraft>,
        total_amount: Option<i64>,
    ) -> DomainResult<(Contract, Vec<Milestone>)> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("contract title must not be empty"));
        }

        let currency = currency.into().to_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(
                "currency must be a 3-letter ISO code",
            ));
        }

        if drafts.is_empty() {
            return Err(DomainError::validation(
                "contract requires at least one milestone",
            ));
        }

        let id = ContractId::new();
        let now = Utc::now();

        let mut milestones = Vec::with_capacity(drafts.len());
        let mut sum: i64 = 0;
        for (position, draft) in drafts.into_iter().enumerate() {
            let milestone = Milestone::new(
                id,
                position as u32,
                draft.title,
                draft.description,
                draft.amount,
                draft.due_at,
            )?;
            sum = sum
                .checked_add(milestone.amount)
                .ok_or_else(|| DomainError::validation("milestone amounts overflow total"))?;
            milestones.push(milestone);
        }

        let total_amount = match total_amount {
            Some(total) if total > 0 => total,
            Some(_) => {
                return Err(DomainError::validation("total_amount must be positive"));
            }
            None => sum,
        };

        let contract = Contract {
            id,
            slug: generate_slug(now),
            title,
            creator_id,
            payer_id,
            payee_id,
            currency,
            total_amount,
            terms,
            status: ContractStatus::Active,
            created_at: now,
        };

        Ok((contract, milestones))
    }

    /// Completion detection: true iff every milestone is Paid.
    pub fn is_complete(milestones: &[Milestone]) -> bool {
        !milestones.is_empty()
            && milestones
                .iter()
                .all(|m| m.status == MilestoneStatus::Paid)
    }
}

/// Time-based prefix (base36 millis) + random suffix from a fresh UUID.
fn generate_slug(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let hex = Uuid::now_v7().simple().to_string();
    // v7 keeps its random bits at the tail.
    format!("bond-{}-{}", to_base36(millis), &hex[hex.len() - 6..])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestone::ApprovedBy;

    fn drafts() -> Vec<MilestoneDraft> {
        vec![
            MilestoneDraft {
                title: "Design".to_string(),
                description: "wireframes + mockups".to_string(),
                amount: 500_00,
                due_at: None,
            },
            MilestoneDraft {
                title: "Build".to_string(),
                description: "implementation".to_string(),
                amount: 1500_00,
                due_at: None,
            },
        ]
    }

    fn create_default() -> (Contract, Vec<Milestone>) {
        Contract::create(
            "Website redesign",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "eur",
            serde_json::json!({"scope": "full"}),
            drafts(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn total_defaults_to_sum_of_milestones() {
        let (contract, milestones) = create_default();
        assert_eq!(contract.total_amount, 2000_00);
        assert_eq!(milestones.len(), 2);
        assert_eq!(contract.status, ContractStatus::Active);
        assert!(milestones.iter().all(|m| m.contract_id == contract.id));
    }

    #[test]
    fn explicit_total_wins_over_sum() {
        let (contract, _) = Contract::create(
            "Fixed fee",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "usd",
            serde_json::Value::Null,
            drafts(),
            Some(1800_00),
        )
        .unwrap();
        assert_eq!(contract.total_amount, 1800_00);
    }

    #[test]
    fn rejects_empty_milestones() {
        let err = Contract::create(
            "Empty",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "eur",
            serde_json::Value::Null,
            vec![],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_bad_currency_and_total() {
        let err = Contract::create(
            "Bad currency",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "euros",
            serde_json::Value::Null,
            drafts(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Contract::create(
            "Bad total",
            UserId::new(),
            UserId::new(),
            UserId::new(),
            "eur",
            serde_json::Value::Null,
            drafts(),
            Some(0),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn milestones_keep_draft_order() {
        let (_, milestones) = create_default();
        assert_eq!(milestones[0].title, "Design");
        assert_eq!(milestones[1].title, "Build");
        assert_eq!(
            milestones.iter().map(|m| m.position).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn slug_has_time_prefix_and_random_suffix() {
        let (a, _) = create_default();
        let (b, _) = create_default();
        assert!(a.slug.starts_with("bond-"));
        assert_ne!(a.slug, b.slug);
    }

    #[test]
    fn completion_requires_every_milestone_paid() {
        let (_, mut milestones) = create_default();
        assert!(!Contract::is_complete(&milestones));

        let now = Utc::now();
        milestones[0].submit(now).unwrap();
        milestones[0].approve(now, ApprovedBy::Human).unwrap();
        assert!(!Contract::is_complete(&milestones));

        milestones[1].submit(now).unwrap();
        milestones[1].approve(now, ApprovedBy::Human).unwrap();
        assert!(Contract::is_complete(&milestones));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn draft_strategy() -> impl Strategy<Value = MilestoneDraft> {
            (1i64..=10_000_000).prop_map(|amount| MilestoneDraft {
                title: "m".to_string(),
                description: String::new(),
                amount,
                due_at: None,
            })
        }

        proptest! {
            #[test]
            fn computed_total_equals_sum(drafts in prop::collection::vec(draft_strategy(), 1..12)) {
                let expected: i64 = drafts.iter().map(|d| d.amount).sum();
                let (contract, milestones) = Contract::create(
                    "prop",
                    UserId::new(),
                    UserId::new(),
                    UserId::new(),
                    "eur",
                    serde_json::Value::Null,
                    drafts,
                    None,
                ).unwrap();
                prop_assert_eq!(contract.total_amount, expected);
                prop_assert_eq!(
                    milestones.iter().map(|m| m.amount).sum::<i64>(),
                    expected
                );
            }

            #[test]
            fn complete_iff_all_paid(
                drafts in prop::collection::vec(draft_strategy(), 1..8),
                paid_mask in prop::collection::vec(any::<bool>(), 8),
            ) {
                let (_, mut milestones) = Contract::create(
                    "prop",
                    UserId::new(),
                    UserId::new(),
                    UserId::new(),
                    "eur",
                    serde_json::Value::Null,
                    drafts,
                    None,
                ).unwrap();

                let now = Utc::now();
                for (i, milestone) in milestones.iter_mut().enumerate() {
                    if paid_mask[i % paid_mask.len()] {
                        milestone.submit(now).unwrap();
                        milestone.approve(now, ApprovedBy::Human).unwrap();
                    }
                }

                let all_paid = milestones.iter().all(|m| m.status == MilestoneStatus::Paid);
                prop_assert_eq!(Contract::is_complete(&milestones), all_paid);
            }
        }
    }
}
