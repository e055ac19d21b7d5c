//! Caching layer in front of the provider configuration store.

mod provider_config;

pub use provider_config::CachedProviderConfigStore;
