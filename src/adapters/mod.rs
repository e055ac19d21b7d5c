//! Adapters - Implementations of port interfaces.
//!
//! - `config_cache` - TTL cache in front of provider credential lookups
//! - `http` - Axum webhook endpoints
//! - `memory` - In-memory stores for tests and database-less runs
//! - `postgres` - PostgreSQL stores (sqlx)

pub mod config_cache;
pub mod http;
pub mod memory;
pub mod postgres;

pub use config_cache::CachedProviderConfigStore;
