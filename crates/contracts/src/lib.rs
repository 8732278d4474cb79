//! `bondly-contracts` — escrow contract and milestone domain model.
//!
//! A contract owns an ordered collection of milestones; each milestone moves
//! forward-only through Draft → Submitted → Paid. Approval is the single
//! authoritative point where "money is now owed to the payee" is recorded;
//! the actual fund transfer is an out-of-band operational step.

pub mod contract;
pub mod milestone;

pub use contract::{Contract, ContractStatus, MilestoneDraft};
pub use milestone::{ApprovedBy, Milestone, MilestoneStatus, Proof, ProofKind};
