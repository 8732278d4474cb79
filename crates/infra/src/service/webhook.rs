use tracing::{info, warn};

use bondly_core::{DomainError, DomainResult};
use bondly_escrow::{verify_signature, WebhookEvent};

use crate::service::escrow::{DepositOutcome, EscrowService};

/// Handles raw payment-provider deliveries.
///
/// Only signature failures are surfaced to the caller. Anything after
/// authentication (malformed body, unknown contract, storage trouble) is
/// logged and acknowledged, so the provider does not retry events we can
/// never process.
#[derive(Clone)]
pub struct WebhookProcessor {
    escrow: EscrowService,
    secret: String,
}

impl WebhookProcessor {
    pub fn new(escrow: EscrowService, secret: impl Into<String>) -> Self {
        Self {
            escrow,
            secret: secret.into(),
        }
    }

    pub async fn process(&self, payload: &[u8], signature_header: &str) -> DomainResult<()> {
        verify_signature(payload, signature_header, &self.secret)?;

        let event = match WebhookEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "authenticated webhook with malformed body, acknowledging");
                return Ok(());
            }
        };

        let Some(notice) = event.as_confirmed_deposit() else {
            info!(event_id = %event.id, event_type = %event.event_type, "ignoring event");
            return Ok(());
        };

        match self.escrow.record_deposit(notice).await {
            Ok(DepositOutcome::Recorded) => {}
            Ok(DepositOutcome::Duplicate) => {
                info!(event_id = %event.id, "duplicate delivery acknowledged");
            }
            Err(DomainError::NotFound) => {
                warn!(event_id = %event.id, "deposit references unknown contract, acknowledging");
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "deposit not recorded, acknowledging");
            }
        }
        Ok(())
    }
}
