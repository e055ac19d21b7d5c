//! OrganizationDirectory port - resolves the tenant a webhook is for.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrganizationId};

#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Looks up an organization by its URL slug (`?org=` on payment webhooks).
    async fn find_by_slug(&self, slug: &str) -> Result<Option<OrganizationId>, DomainError>;

    /// Looks up the organization that owns a messaging instance.
    async fn find_by_messaging_instance(
        &self,
        instance: &str,
    ) -> Result<Option<OrganizationId>, DomainError>;
}
