//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod webhook;

pub use webhook::{
    // Handlers
    HandleMessagingWebhookHandler,
    HandlePaymentWebhookHandler,
    PaymentReconciler,
    ReferenceResolver,
    AuditLogger,
    // Commands and Results
    HandleMessagingWebhookCommand,
    HandleMessagingWebhookResult,
    HandlePaymentWebhookCommand,
    HandlePaymentWebhookResult,
    ReconcileResult,
    FinalStatus,
};
