//! In-memory provider credentials store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::ProviderCredentials;
use crate::ports::ProviderConfigStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderConfigStore {
    credentials: Arc<RwLock<HashMap<(OrganizationId, Provider), ProviderCredentials>>>,
}

impl InMemoryProviderConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        organization_id: OrganizationId,
        provider: Provider,
        credentials: ProviderCredentials,
    ) {
        self.credentials
            .write()
            .await
            .insert((organization_id, provider), credentials);
    }

    pub async fn remove(&self, organization_id: &OrganizationId, provider: Provider) {
        self.credentials
            .write()
            .await
            .remove(&(*organization_id, provider));
    }
}

#[async_trait]
impl ProviderConfigStore for InMemoryProviderConfigStore {
    async fn credentials(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
    ) -> Result<Option<ProviderCredentials>, DomainError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(&(*organization_id, provider)).cloned())
    }
}
