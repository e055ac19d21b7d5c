//! In-memory organization directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::ports::OrganizationDirectory;

#[derive(Debug, Default)]
struct Directory {
    by_slug: HashMap<String, OrganizationId>,
    by_instance: HashMap<String, OrganizationId>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrganizationDirectory {
    directory: Arc<RwLock<Directory>>,
}

impl InMemoryOrganizationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, slug: impl Into<String>, organization_id: OrganizationId) {
        self.directory
            .write()
            .await
            .by_slug
            .insert(slug.into(), organization_id);
    }

    pub async fn insert_messaging_instance(
        &self,
        instance: impl Into<String>,
        organization_id: OrganizationId,
    ) {
        self.directory
            .write()
            .await
            .by_instance
            .insert(instance.into(), organization_id);
    }
}

#[async_trait]
impl OrganizationDirectory for InMemoryOrganizationDirectory {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<OrganizationId>, DomainError> {
        Ok(self.directory.read().await.by_slug.get(slug).copied())
    }

    async fn find_by_messaging_instance(
        &self,
        instance: &str,
    ) -> Result<Option<OrganizationId>, DomainError> {
        Ok(self.directory.read().await.by_instance.get(instance).copied())
    }
}
