//! `bondly-escrow` — platform-held escrow records and the payment-provider
//! webhook event model.
//!
//! `EscrowBatch` rows are the append-only ledger of funds confirmed into the
//! platform's custody account; `PayoutLog` rows record obligations toward the
//! payee created at milestone approval. Neither is mutated after insert.

pub mod batch;
pub mod payout;
pub mod webhook;

pub use batch::EscrowBatch;
pub use payout::PayoutLog;
pub use webhook::{signature_header, verify_signature, DepositNotice, WebhookEvent};
