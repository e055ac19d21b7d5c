//! Provider-neutral payment event.

use serde::{Deserialize, Serialize};

use super::provider::Provider;
use super::status::PaymentStatus;
use crate::domain::foundation::Timestamp;

/// One provider transaction report, normalized from the wire payload.
///
/// `provider_transaction_id` is unique per provider and is the idempotency
/// key for the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub provider: Provider,
    pub provider_transaction_id: String,
    pub provider_reference: String,
    pub status: PaymentStatus,
    pub amount_minor_units: i64,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    /// Payload exactly as received, kept for audit.
    pub raw_payload: serde_json::Value,
    pub occurred_at: Timestamp,
}
