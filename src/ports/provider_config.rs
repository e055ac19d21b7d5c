//! ProviderConfigStore port - per-organization provider credentials.
//!
//! Read-only from this service's point of view. The admin side writes the
//! credentials; webhooks only look them up.

use async_trait::async_trait;

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::ProviderCredentials;

#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    /// Credentials for `provider`, or `None` when the organization has not
    /// configured it.
    async fn credentials(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
    ) -> Result<Option<ProviderCredentials>, DomainError>;
}
