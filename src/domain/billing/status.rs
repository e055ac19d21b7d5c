//! Payment, order and subscription status enums.
//!
//! `PaymentStatus` is the provider-neutral outcome of one transaction.
//! `OrderPaymentStatus` and `SubscriptionStatus` belong to the entities a
//! transaction pays for, and only move along their state machines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Normalized transaction status across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Declined,
    Voided,
    Error,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Approved,
        PaymentStatus::Declined,
        PaymentStatus::Voided,
        PaymentStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Voided => "voided",
            PaymentStatus::Error => "error",
        }
    }

    /// Every status except `Pending` is a final answer from the provider.
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// True only for the success terminal status.
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }

    /// Whether a ledger row in `self` may be overwritten by `incoming`.
    ///
    /// Pending yields to anything. An approved payment can only be voided.
    /// Declined, error and voided are final.
    pub fn superseded_by(&self, incoming: PaymentStatus) -> bool {
        match (self, incoming) {
            (current, incoming) if *current == incoming => false,
            (PaymentStatus::Pending, _) => true,
            (PaymentStatus::Approved, PaymentStatus::Voided) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("payment_status", s))
    }
}

/// Payment status of a store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

impl OrderPaymentStatus {
    pub const ALL: [OrderPaymentStatus; 4] = [
        OrderPaymentStatus::Pending,
        OrderPaymentStatus::Processing,
        OrderPaymentStatus::Paid,
        OrderPaymentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Processing => "processing",
            OrderPaymentStatus::Paid => "paid",
            OrderPaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for OrderPaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderPaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("order_payment_status", s))
    }
}

impl StateMachine for OrderPaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderPaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Paid)
                | (Pending, Failed)
                | (Processing, Paid)
                | (Processing, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderPaymentStatus::*;
        match self {
            Pending => vec![Processing, Paid, Failed],
            Processing => vec![Paid, Failed],
            Paid | Failed => vec![],
        }
    }

    fn stage(&self) -> u8 {
        match self {
            OrderPaymentStatus::Pending => 0,
            OrderPaymentStatus::Processing => 1,
            OrderPaymentStatus::Paid | OrderPaymentStatus::Failed => 2,
        }
    }
}

/// Fulfillment status of a store order.
///
/// Only the `Pending -> Confirmed` step is driven by payment webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 5] = [
        FulfillmentStatus::Pending,
        FulfillmentStatus::Confirmed,
        FulfillmentStatus::Shipped,
        FulfillmentStatus::Delivered,
        FulfillmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Confirmed => "confirmed",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }

    /// Status after an approved payment: pending orders become confirmed,
    /// anything further along is left alone.
    pub fn confirmed_by_payment(self) -> Self {
        match self {
            FulfillmentStatus::Pending => FulfillmentStatus::Confirmed,
            other => other,
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FulfillmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("fulfillment_status", s))
    }
}

/// Status of a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    /// Set by account management only; payment webhooks never produce it.
    Cancelled,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 4] = [
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("subscription_status", s))
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Trialing, Active)
                | (Trialing, PastDue)
                | (Active, Active) // renewal
                | (Active, PastDue)
                | (PastDue, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trialing => vec![Active, PastDue],
            Active => vec![Active, PastDue],
            PastDue => vec![Active],
            Cancelled => vec![],
        }
    }

    fn stage(&self) -> u8 {
        match self {
            SubscriptionStatus::Trialing => 0,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => 1,
            SubscriptionStatus::Cancelled => 2,
        }
    }
}

/// How far one approved payment extends a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Annual => 12,
        }
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "annual" | "yearly" => Ok(BillingCycle::Annual),
            other => Err(ValidationError::invalid_format("billing_cycle", other)),
        }
    }
}
