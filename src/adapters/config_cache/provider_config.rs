//! TTL cache for per-organization provider credentials.
//!
//! Credentials change rarely and are read on every webhook, so lookups are
//! cached per `(organization, provider)`. Misses are cached too, so an
//! unconfigured provider does not hit the store on every delivery. Store
//! errors are never cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::ProviderCredentials;
use crate::ports::ProviderConfigStore;

/// Default time an entry stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Cached lookup with expiry tracking.
#[derive(Clone)]
struct CachedEntry {
    credentials: Option<ProviderCredentials>,
    fetched_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

pub struct CachedProviderConfigStore {
    inner: Arc<dyn ProviderConfigStore>,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<(OrganizationId, Provider), CachedEntry>>>,
}

impl CachedProviderConfigStore {
    pub fn new(inner: Arc<dyn ProviderConfigStore>) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: Arc<dyn ProviderConfigStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drops one entry so the next lookup goes to the store.
    pub async fn invalidate(&self, organization_id: &OrganizationId, provider: Provider) {
        self.entries
            .write()
            .await
            .remove(&(*organization_id, provider));
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl ProviderConfigStore for CachedProviderConfigStore {
    async fn credentials(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
    ) -> Result<Option<ProviderCredentials>, DomainError> {
        let key = (*organization_id, provider);

        // Check cache first
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if !entry.is_expired(self.ttl) {
                    return Ok(entry.credentials.clone());
                }
            }
        }

        let credentials = self.inner.credentials(organization_id, provider).await?;
        tracing::debug!(
            organization_id = %organization_id,
            provider = %provider,
            configured = credentials.is_some(),
            "Provider credentials refreshed"
        );

        self.entries.write().await.insert(
            key,
            CachedEntry {
                credentials: credentials.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(credentials)
    }
}
