//! Webhook handlers - payment reconciliation and messaging delivery.
//!
//! # Module Structure
//!
//! - `reference_resolver` - provider reference to order or subscription
//! - `reconcile_payment` - idempotent ledger upsert and entity transition
//! - `audit` - best-effort audit trail writer
//! - `handle_payment_webhook` - full payment pipeline
//! - `handle_messaging_webhook` - WhatsApp messaging pipeline

mod audit;
mod handle_messaging_webhook;
mod handle_payment_webhook;
mod reconcile_payment;
mod reference_resolver;

pub use audit::{payload_value, AuditLogger, REDACTED};
pub use handle_messaging_webhook::{
    HandleMessagingWebhookCommand, HandleMessagingWebhookHandler, HandleMessagingWebhookResult,
};
pub use handle_payment_webhook::{
    acknowledgement, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandlePaymentWebhookResult,
};
pub use reconcile_payment::{
    FinalStatus, PaymentReconciler, ReconcileResult, DEFAULT_MAX_TRANSITION_ATTEMPTS,
};
pub use reference_resolver::{order_lookups, OrderLookup, ReferenceResolver};
