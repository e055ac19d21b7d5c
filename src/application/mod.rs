//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers receive their ports as `Arc<dyn Port>` and never touch adapters.

pub mod handlers;

pub use handlers::{
    AuditLogger, FinalStatus, HandleMessagingWebhookCommand, HandleMessagingWebhookHandler,
    HandleMessagingWebhookResult, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandlePaymentWebhookResult, PaymentReconciler, ReconcileResult, ReferenceResolver,
};
