//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresTransactionLedger` - Conflict-aware upsert keyed by provider transaction
//! - `PostgresOrderRepository` / `PostgresSubscriptionRepository` - Compare-and-swap transitions
//! - `PostgresWebhookLogRepository` - Append-only audit trail
//! - `PostgresProviderConfigStore` - Per-organization provider credentials
//! - `PostgresOrganizationDirectory` - Tenant lookup
//! - `PostgresMessagingEventSink` - Accepted messaging events

mod messaging_event_sink;
mod order_repository;
mod organization_directory;
mod provider_config;
mod subscription_repository;
mod transaction_ledger;
mod webhook_log_repository;

pub use messaging_event_sink::PostgresMessagingEventSink;
pub use order_repository::PostgresOrderRepository;
pub use organization_directory::PostgresOrganizationDirectory;
pub use provider_config::PostgresProviderConfigStore;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use transaction_ledger::PostgresTransactionLedger;
pub use webhook_log_repository::PostgresWebhookLogRepository;

use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Parses a text column into its domain enum.
fn decode<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = ValidationError>,
{
    value.parse().map_err(|e: ValidationError| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}
