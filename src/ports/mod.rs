//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Reconciliation Ports
//!
//! - `TransactionLedger` - Idempotent upsert keyed by provider transaction id
//! - `OrderRepository` - Compare-and-swap payment status on store orders
//! - `SubscriptionRepository` - Compare-and-swap status and billing period
//!
//! ## Webhook Ports
//!
//! - `ProviderConfigStore` - Per-organization provider credentials
//! - `OrganizationDirectory` - Tenant lookup by slug or messaging instance
//! - `WebhookLogRepository` - Append-only audit trail
//! - `MessagingEventSink` - Delivery of accepted messaging events

mod messaging_event_sink;
mod order_repository;
mod organization_directory;
mod provider_config;
mod subscription_repository;
mod transaction_ledger;
mod webhook_log_repository;

pub use messaging_event_sink::MessagingEventSink;
pub use order_repository::OrderRepository;
pub use organization_directory::OrganizationDirectory;
pub use provider_config::ProviderConfigStore;
pub use subscription_repository::{SubscriptionRepository, SubscriptionUpdate};
pub use transaction_ledger::{LedgerChange, TransactionLedger, UpsertOutcome};
pub use webhook_log_repository::{
    WebhookLogRecord, WebhookLogRepository, WebhookOutcome, WebhookSource,
};
