//! Payment-provider webhook events and signature verification.
//!
//! Signatures are verified against the **raw request bytes** — parsing the
//! body before verification would break the signed payload. The scheme is the
//! provider's `t=<unix>,v1=<hex>` header: HMAC-SHA256 over `"{t}.{body}"`
//! with the shared endpoint secret.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use bondly_core::{ContractId, DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;

/// Event type carried by deposits confirmed into escrow.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Verify a `t=...,v1=...` signature header against the raw payload bytes.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> DomainResult<()> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| DomainError::upstream_auth("signature header missing timestamp"))?;
    let signature = signature
        .ok_or_else(|| DomainError::upstream_auth("signature header missing v1 signature"))?;
    let signature = hex::decode(signature)
        .map_err(|e| DomainError::upstream_auth(format!("invalid signature hex: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DomainError::internal(format!("hmac init failed: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&signature)
        .map_err(|_| DomainError::upstream_auth("signature verification failed"))
}

/// Produce a valid `t=...,v1=...` header for a payload. Used by tests and
/// local tooling to simulate provider deliveries.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={digest}")
}

/// Provider event envelope (only the fields this system consumes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub amount_received: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A confirmed deposit extracted from a provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositNotice {
    pub contract_id: ContractId,
    pub amount: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub charge_id: Option<String>,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| DomainError::validation(format!("malformed webhook payload: {e}")))
    }

    /// Extract a deposit notice when the event denotes confirmed funds and
    /// carries a contract id in its metadata. Events without a parseable
    /// contract id are not deposits for this system and yield `None`.
    pub fn as_confirmed_deposit(&self) -> Option<DepositNotice> {
        if self.event_type != PAYMENT_SUCCEEDED {
            return None;
        }
        let object = &self.data.object;
        let contract_id: ContractId = object.metadata.get("contract_id")?.parse().ok()?;
        Some(DepositNotice {
            contract_id,
            amount: object.amount_received,
            currency: object.currency.clone(),
            payment_intent_id: object.id.clone(),
            charge_id: object.latest_charge.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sample_event(contract_id: ContractId) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_123",
                    "amount_received": 2000_00,
                    "currency": "eur",
                    "latest_charge": "ch_9",
                    "metadata": { "contract_id": contract_id.to_string() }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_round_trips() {
        let payload = b"{\"id\":\"evt_1\"}";
        let header = signature_header(payload, SECRET, 1_700_000_000);
        verify_signature(payload, &header, SECRET).unwrap();
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = signature_header(b"original", SECRET, 1_700_000_000);
        let err = verify_signature(b"tampered", &header, SECRET).unwrap_err();
        assert!(matches!(err, DomainError::UpstreamAuth(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = signature_header(b"payload", "whsec_other", 1_700_000_000);
        let err = verify_signature(b"payload", &header, SECRET).unwrap_err();
        assert!(matches!(err, DomainError::UpstreamAuth(_)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        for header in ["", "v1=abc", "t=123", "t=123,v1=zz-not-hex"] {
            let err = verify_signature(b"payload", header, SECRET).unwrap_err();
            assert!(matches!(err, DomainError::UpstreamAuth(_)), "{header}");
        }
    }

    #[test]
    fn deposit_extraction_reads_metadata() {
        let contract_id = ContractId::new();
        let event = WebhookEvent::parse(&sample_event(contract_id)).unwrap();
        let notice = event.as_confirmed_deposit().unwrap();
        assert_eq!(notice.contract_id, contract_id);
        assert_eq!(notice.amount, 2000_00);
        assert_eq!(notice.payment_intent_id, "pi_123");
        assert_eq!(notice.charge_id.as_deref(), Some("ch_9"));
    }

    #[test]
    fn non_deposit_events_are_ignored() {
        let mut raw: serde_json::Value =
            serde_json::from_slice(&sample_event(ContractId::new())).unwrap();
        raw["type"] = "payment_intent.created".into();
        let event: WebhookEvent = serde_json::from_value(raw).unwrap();
        assert!(event.as_confirmed_deposit().is_none());
    }

    #[test]
    fn missing_contract_metadata_is_ignored() {
        let raw = serde_json::json!({
            "id": "evt_2",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_2", "amount_received": 100, "currency": "eur" } }
        });
        let event: WebhookEvent = serde_json::from_value(raw).unwrap();
        assert!(event.as_confirmed_deposit().is_none());
    }
}
