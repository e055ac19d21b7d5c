//! In-memory adapters for every port.
//!
//! Each store sits behind a single lock, so upserts and compare-and-swap
//! updates are atomic just as they are in Postgres. Used by tests and for
//! running the service without a database.

mod messaging_event_sink;
mod order_repository;
mod organization_directory;
mod provider_config;
mod subscription_repository;
mod transaction_ledger;
mod webhook_log_repository;

pub use messaging_event_sink::InMemoryMessagingEventSink;
pub use order_repository::InMemoryOrderRepository;
pub use organization_directory::InMemoryOrganizationDirectory;
pub use provider_config::InMemoryProviderConfigStore;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use transaction_ledger::InMemoryTransactionLedger;
pub use webhook_log_repository::InMemoryWebhookLogRepository;
