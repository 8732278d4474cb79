//! Postgres-backed store implementation.
//!
//! Uniqueness of `payment_intent_id` is enforced by the schema, so duplicate
//! deposit recording is rejected even under concurrent webhook deliveries.
//! Submit atomicity (proof rows + status update) rides on a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use bondly_contracts::{ApprovedBy, Contract, ContractStatus, Milestone, MilestoneStatus, Proof, ProofKind};
use bondly_core::{ContractId, DomainError, DomainResult, MilestoneId, UserId};
use bondly_escrow::{EscrowBatch, PayoutLog};

use super::{ContractStore, EscrowStore};

/// Table definitions. Applied idempotently at startup via [`PostgresStore::ensure_schema`].
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contracts (
    id            UUID PRIMARY KEY,
    slug          TEXT NOT NULL UNIQUE,
    title         TEXT NOT NULL,
    creator_id    UUID NOT NULL,
    payer_id      UUID NOT NULL,
    payee_id      UUID NOT NULL,
    currency      TEXT NOT NULL,
    total_amount  BIGINT NOT NULL,
    terms         JSONB NOT NULL,
    status        TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS milestones (
    id            UUID PRIMARY KEY,
    contract_id   UUID NOT NULL REFERENCES contracts(id),
    position      INTEGER NOT NULL,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    amount        BIGINT NOT NULL CHECK (amount > 0),
    due_at        TIMESTAMPTZ,
    status        TEXT NOT NULL,
    submitted_at  TIMESTAMPTZ,
    approved_at   TIMESTAMPTZ,
    approved_by   TEXT
);

CREATE TABLE IF NOT EXISTS proofs (
    id            UUID PRIMARY KEY,
    milestone_id  UUID NOT NULL REFERENCES milestones(id),
    url           TEXT NOT NULL,
    kind          TEXT NOT NULL,
    added_at      TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id     UUID PRIMARY KEY,
    email  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS escrow_batches (
    id                 UUID PRIMARY KEY,
    contract_id        UUID NOT NULL,
    amount             BIGINT NOT NULL,
    currency           TEXT NOT NULL,
    payment_intent_id  TEXT NOT NULL UNIQUE,
    charge_id          TEXT,
    received_at        TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS payout_logs (
    id            UUID PRIMARY KEY,
    milestone_id  UUID NOT NULL,
    payee_email   TEXT NOT NULL,
    amount        BIGINT NOT NULL,
    method        TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL
);
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables when missing.
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }
}

fn internal(e: sqlx::Error) -> DomainError {
    DomainError::internal(format!("postgres: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505")
}

fn contract_status_str(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Active => "active",
        ContractStatus::Completed => "completed",
    }
}

fn parse_contract_status(s: &str) -> DomainResult<ContractStatus> {
    match s {
        "active" => Ok(ContractStatus::Active),
        "completed" => Ok(ContractStatus::Completed),
        other => Err(DomainError::internal(format!(
            "unknown contract status in store: {other}"
        ))),
    }
}

fn milestone_status_str(status: MilestoneStatus) -> &'static str {
    match status {
        MilestoneStatus::Draft => "draft",
        MilestoneStatus::Submitted => "submitted",
        MilestoneStatus::Paid => "paid",
    }
}

fn parse_milestone_status(s: &str) -> DomainResult<MilestoneStatus> {
    match s {
        "draft" => Ok(MilestoneStatus::Draft),
        "submitted" => Ok(MilestoneStatus::Submitted),
        "paid" => Ok(MilestoneStatus::Paid),
        other => Err(DomainError::internal(format!(
            "unknown milestone status in store: {other}"
        ))),
    }
}

fn approved_by_str(by: ApprovedBy) -> &'static str {
    match by {
        ApprovedBy::Human => "human",
        ApprovedBy::Timeout => "timeout",
    }
}

fn parse_approved_by(s: &str) -> DomainResult<ApprovedBy> {
    match s {
        "human" => Ok(ApprovedBy::Human),
        "timeout" => Ok(ApprovedBy::Timeout),
        other => Err(DomainError::internal(format!(
            "unknown approver kind in store: {other}"
        ))),
    }
}

fn proof_kind_str(kind: ProofKind) -> &'static str {
    match kind {
        ProofKind::File => "file",
        ProofKind::Link => "link",
        ProofKind::Note => "note",
    }
}

fn parse_proof_kind(s: &str) -> DomainResult<ProofKind> {
    match s {
        "file" => Ok(ProofKind::File),
        "link" => Ok(ProofKind::Link),
        "note" => Ok(ProofKind::Note),
        other => Err(DomainError::internal(format!(
            "unknown proof kind in store: {other}"
        ))),
    }
}

fn row_to_contract(row: &sqlx::postgres::PgRow) -> DomainResult<Contract> {
    let status: String = row.try_get("status").map_err(internal)?;
    Ok(Contract {
        id: ContractId::from_uuid(row.try_get("id").map_err(internal)?),
        slug: row.try_get("slug").map_err(internal)?,
        title: row.try_get("title").map_err(internal)?,
        creator_id: UserId::from_uuid(row.try_get("creator_id").map_err(internal)?),
        payer_id: UserId::from_uuid(row.try_get("payer_id").map_err(internal)?),
        payee_id: UserId::from_uuid(row.try_get("payee_id").map_err(internal)?),
        currency: row.try_get("currency").map_err(internal)?,
        total_amount: row.try_get("total_amount").map_err(internal)?,
        terms: row.try_get("terms").map_err(internal)?,
        status: parse_contract_status(&status)?,
        created_at: row.try_get("created_at").map_err(internal)?,
    })
}

fn row_to_milestone(row: &sqlx::postgres::PgRow) -> DomainResult<Milestone> {
    let status: String = row.try_get("status").map_err(internal)?;
    let approved_by: Option<String> = row.try_get("approved_by").map_err(internal)?;
    let position: i32 = row.try_get("position").map_err(internal)?;
    Ok(Milestone {
        id: MilestoneId::from_uuid(row.try_get("id").map_err(internal)?),
        contract_id: ContractId::from_uuid(row.try_get("contract_id").map_err(internal)?),
        position: position as u32,
        title: row.try_get("title").map_err(internal)?,
        description: row.try_get("description").map_err(internal)?,
        amount: row.try_get("amount").map_err(internal)?,
        due_at: row.try_get("due_at").map_err(internal)?,
        status: parse_milestone_status(&status)?,
        submitted_at: row.try_get("submitted_at").map_err(internal)?,
        approved_at: row.try_get("approved_at").map_err(internal)?,
        approved_by: approved_by.as_deref().map(parse_approved_by).transpose()?,
    })
}

fn row_to_proof(row: &sqlx::postgres::PgRow) -> DomainResult<Proof> {
    let kind: String = row.try_get("kind").map_err(internal)?;
    Ok(Proof {
        id: row.try_get("id").map_err(internal)?,
        milestone_id: MilestoneId::from_uuid(row.try_get("milestone_id").map_err(internal)?),
        url: row.try_get("url").map_err(internal)?,
        kind: parse_proof_kind(&kind)?,
        added_at: row.try_get("added_at").map_err(internal)?,
    })
}

fn row_to_batch(row: &sqlx::postgres::PgRow) -> DomainResult<EscrowBatch> {
    Ok(EscrowBatch {
        id: row.try_get("id").map_err(internal)?,
        contract_id: ContractId::from_uuid(row.try_get("contract_id").map_err(internal)?),
        amount: row.try_get("amount").map_err(internal)?,
        currency: row.try_get("currency").map_err(internal)?,
        payment_intent_id: row.try_get("payment_intent_id").map_err(internal)?,
        charge_id: row.try_get("charge_id").map_err(internal)?,
        received_at: row.try_get("received_at").map_err(internal)?,
    })
}

fn row_to_payout(row: &sqlx::postgres::PgRow) -> DomainResult<PayoutLog> {
    Ok(PayoutLog {
        id: row.try_get("id").map_err(internal)?,
        milestone_id: MilestoneId::from_uuid(row.try_get("milestone_id").map_err(internal)?),
        payee_email: row.try_get("payee_email").map_err(internal)?,
        amount: row.try_get("amount").map_err(internal)?,
        method: row.try_get("method").map_err(internal)?,
        status: row.try_get("status").map_err(internal)?,
        created_at: row.try_get("created_at").map_err(internal)?,
    })
}

#[async_trait]
impl ContractStore for PostgresStore {
    async fn insert_contract(
        &self,
        contract: &Contract,
        milestones: &[Milestone],
    ) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        sqlx::query(
            r#"
            INSERT INTO contracts
                (id, slug, title, creator_id, payer_id, payee_id, currency,
                 total_amount, terms, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(contract.id.as_uuid())
        .bind(&contract.slug)
        .bind(&contract.title)
        .bind(contract.creator_id.as_uuid())
        .bind(contract.payer_id.as_uuid())
        .bind(contract.payee_id.as_uuid())
        .bind(&contract.currency)
        .bind(contract.total_amount)
        .bind(&contract.terms)
        .bind(contract_status_str(contract.status))
        .bind(contract.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict("contract already exists")
            } else {
                internal(e)
            }
        })?;

        for milestone in milestones {
            sqlx::query(
                r#"
                INSERT INTO milestones
                    (id, contract_id, position, title, description, amount, due_at,
                     status, submitted_at, approved_at, approved_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(milestone.id.as_uuid())
            .bind(milestone.contract_id.as_uuid())
            .bind(milestone.position as i32)
            .bind(&milestone.title)
            .bind(&milestone.description)
            .bind(milestone.amount)
            .bind(milestone.due_at)
            .bind(milestone_status_str(milestone.status))
            .bind(milestone.submitted_at)
            .bind(milestone.approved_at)
            .bind(milestone.approved_by.map(approved_by_str))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        }

        tx.commit().await.map_err(internal)
    }

    async fn get_contract(&self, id: ContractId) -> DomainResult<Option<Contract>> {
        let row = sqlx::query("SELECT * FROM contracts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(row_to_contract).transpose()
    }

    async fn contract_milestones(&self, id: ContractId) -> DomainResult<Vec<Milestone>> {
        let rows = sqlx::query("SELECT * FROM milestones WHERE contract_id = $1 ORDER BY position ASC")
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.iter().map(row_to_milestone).collect()
    }

    async fn get_milestone(&self, id: MilestoneId) -> DomainResult<Option<Milestone>> {
        let row = sqlx::query("SELECT * FROM milestones WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(row_to_milestone).transpose()
    }

    async fn submit_milestone(
        &self,
        id: MilestoneId,
        proofs: Vec<Proof>,
        now: DateTime<Utc>,
    ) -> DomainResult<Milestone> {
        for proof in &proofs {
            if proof.url.trim().is_empty() {
                return Err(DomainError::validation("proof url must not be empty"));
            }
            if proof.milestone_id != id {
                return Err(DomainError::validation("proof references another milestone"));
            }
        }

        let mut tx = self.pool.begin().await.map_err(internal)?;

        let row = sqlx::query("SELECT * FROM milestones WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal)?;
        let mut milestone = match row.as_ref().map(row_to_milestone).transpose()? {
            Some(m) => m,
            None => return Err(DomainError::NotFound),
        };

        milestone.submit(now)?;

        for proof in &proofs {
            sqlx::query(
                "INSERT INTO proofs (id, milestone_id, url, kind, added_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(proof.id)
            .bind(proof.milestone_id.as_uuid())
            .bind(&proof.url)
            .bind(proof_kind_str(proof.kind))
            .bind(proof.added_at)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        }

        sqlx::query("UPDATE milestones SET status = $2, submitted_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(milestone_status_str(milestone.status))
            .bind(milestone.submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        tx.commit().await.map_err(internal)?;
        Ok(milestone)
    }

    async fn update_milestone(&self, milestone: &Milestone) -> DomainResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE milestones
            SET status = $2, submitted_at = $3, approved_at = $4, approved_by = $5
            WHERE id = $1
            "#,
        )
        .bind(milestone.id.as_uuid())
        .bind(milestone_status_str(milestone.status))
        .bind(milestone.submitted_at)
        .bind(milestone.approved_at)
        .bind(milestone.approved_by.map(approved_by_str))
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn milestone_proofs(&self, id: MilestoneId) -> DomainResult<Vec<Proof>> {
        let rows = sqlx::query("SELECT * FROM proofs WHERE milestone_id = $1 ORDER BY added_at ASC")
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.iter().map(row_to_proof).collect()
    }

    async fn list_submitted_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Milestone>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM milestones
            WHERE status = 'submitted' AND submitted_at < $1
            ORDER BY submitted_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.iter().map(row_to_milestone).collect()
    }

    async fn set_contract_status(
        &self,
        id: ContractId,
        status: ContractStatus,
    ) -> DomainResult<()> {
        let result = sqlx::query("UPDATE contracts SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(contract_status_str(status))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn resolve_payee_email(&self, user_id: UserId) -> DomainResult<Option<String>> {
        let row = sqlx::query("SELECT email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(|r| r.try_get::<String, _>("email").map_err(internal))
            .transpose()
    }

    async fn upsert_user_email(&self, user_id: UserId, email: &str) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET email = $2",
        )
        .bind(user_id.as_uuid())
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }
}

#[async_trait]
impl EscrowStore for PostgresStore {
    async fn insert_batch(&self, batch: &EscrowBatch) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO escrow_batches
                (id, contract_id, amount, currency, payment_intent_id, charge_id, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(batch.id)
        .bind(batch.contract_id.as_uuid())
        .bind(batch.amount)
        .bind(&batch.currency)
        .bind(&batch.payment_intent_id)
        .bind(&batch.charge_id)
        .bind(batch.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict(format!(
                    "escrow batch already recorded for payment intent {}",
                    batch.payment_intent_id
                ))
            } else {
                internal(e)
            }
        })?;
        Ok(())
    }

    async fn find_batch_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> DomainResult<Option<EscrowBatch>> {
        let row = sqlx::query("SELECT * FROM escrow_batches WHERE payment_intent_id = $1")
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(row_to_batch).transpose()
    }

    async fn list_batches(&self, contract_id: ContractId) -> DomainResult<Vec<EscrowBatch>> {
        let rows = sqlx::query(
            "SELECT * FROM escrow_batches WHERE contract_id = $1 ORDER BY received_at ASC",
        )
        .bind(contract_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.iter().map(row_to_batch).collect()
    }

    async fn insert_payout(&self, payout: &PayoutLog) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payout_logs
                (id, milestone_id, payee_email, amount, method, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payout.id)
        .bind(payout.milestone_id.as_uuid())
        .bind(&payout.payee_email)
        .bind(payout.amount)
        .bind(&payout.method)
        .bind(&payout.status)
        .bind(payout.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn list_payouts(&self, milestone_id: MilestoneId) -> DomainResult<Vec<PayoutLog>> {
        let rows = sqlx::query(
            "SELECT * FROM payout_logs WHERE milestone_id = $1 ORDER BY created_at ASC",
        )
        .bind(milestone_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.iter().map(row_to_payout).collect()
    }
}
