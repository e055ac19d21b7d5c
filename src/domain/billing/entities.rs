//! Records the reconciler reads and mutates.
//!
//! Orders and subscriptions are owned by the surrounding application; this
//! crate only changes their payment-related fields. Ledger rows are owned
//! here.

use serde::{Deserialize, Serialize};

use super::provider::Provider;
use super::status::{
    BillingCycle, FulfillmentStatus, OrderPaymentStatus, PaymentStatus, SubscriptionStatus,
};
use crate::domain::foundation::{
    LedgerRowId, OrderId, OrganizationId, SubscriptionId, Timestamp,
};

/// Store order, as far as payments are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub organization_id: OrganizationId,
    pub payment_status: OrderPaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    /// Reference generated when the payment was initiated.
    pub payment_reference: Option<String>,
    pub updated_at: Timestamp,
}

/// Recurring subscription with its current billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub organization_id: OrganizationId,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Billing period after one approved payment.
    ///
    /// The new period starts at the later of `now` and the current period
    /// end, so paying early never shortens what was already paid for, and
    /// paying late never back-dates coverage.
    pub fn renewed_period(&self, now: Timestamp) -> (Timestamp, Timestamp) {
        let start = now.latest(self.current_period_end);
        (start, start.add_months(self.billing_cycle.months()))
    }
}

/// Durable, idempotency-keyed record of one provider transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLedgerRow {
    pub id: LedgerRowId,
    pub organization_id: OrganizationId,
    pub provider: Provider,
    pub provider_transaction_id: String,
    pub provider_reference: String,
    pub order_id: Option<OrderId>,
    pub subscription_id: Option<SubscriptionId>,
    pub status: PaymentStatus,
    pub amount_minor_units: i64,
    pub currency: String,
    pub raw_response: serde_json::Value,
    /// Status whose order/subscription effect has been claimed. Trails
    /// `status` until the reconciler applies the transition.
    pub applied_status: Option<PaymentStatus>,
    /// Set once, on the first transition into `Approved`.
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The order or subscription a transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentOwner {
    Order(OrderId),
    Subscription(SubscriptionId),
}

impl PaymentOwner {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            PaymentOwner::Order(id) => Some(*id),
            PaymentOwner::Subscription(_) => None,
        }
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        match self {
            PaymentOwner::Subscription(id) => Some(*id),
            PaymentOwner::Order(_) => None,
        }
    }
}
