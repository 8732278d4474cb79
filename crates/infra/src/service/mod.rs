//! Application services orchestrating the domain model through the stores.

pub mod contracts;
pub mod escrow;
pub mod milestones;
pub mod sweeper;
pub mod webhook;

pub use contracts::{ContractService, CreateContract};
pub use escrow::{DepositOutcome, EscrowService};
pub use milestones::{ApprovalOutcome, MilestoneService};
pub use sweeper::AutoApprovalSweeper;
pub use webhook::WebhookProcessor;
