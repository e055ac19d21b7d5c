//! Application configuration module
//!
//! Configuration is loaded from environment variables with the
//! `PAYMENT_WEBHOOKS` prefix, using `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use payment_webhooks::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod server;
mod webhook;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, LogFormat, ServerConfig};
pub use webhook::WebhookConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Webhook handling (messaging secret, caching, retries, audit)
    #[serde(default)]
    pub webhooks: WebhookConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads variables such as:
    ///
    /// - `PAYMENT_WEBHOOKS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYMENT_WEBHOOKS__DATABASE__URL=...` -> `database.url = ...`
    /// - `PAYMENT_WEBHOOKS__WEBHOOKS__MESSAGING_SECRET=...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYMENT_WEBHOOKS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// A database URL is only required in production. Elsewhere the
    /// service falls back to in-memory storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate(self.is_production())?;
        self.webhooks.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
