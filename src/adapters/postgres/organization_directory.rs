//! PostgreSQL implementation of OrganizationDirectory.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::ports::OrganizationDirectory;

pub struct PostgresOrganizationDirectory {
    pool: PgPool,
}

impl PostgresOrganizationDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationDirectory for PostgresOrganizationDirectory {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<OrganizationId>, DomainError> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find organization: {}", e)))?;

        Ok(id.map(OrganizationId::from_uuid))
    }

    async fn find_by_messaging_instance(
        &self,
        instance: &str,
    ) -> Result<Option<OrganizationId>, DomainError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM organizations WHERE messaging_instance = $1")
                .bind(instance)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to find messaging instance: {}", e))
                })?;

        Ok(id.map(OrganizationId::from_uuid))
    }
}
