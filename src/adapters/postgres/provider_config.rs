//! PostgreSQL implementation of ProviderConfigStore.

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::PgPool;

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::ProviderCredentials;
use crate::ports::ProviderConfigStore;

pub struct PostgresProviderConfigStore {
    pool: PgPool,
}

impl PostgresProviderConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProviderConfigRow {
    public_key: String,
    private_key: String,
    integrity_secret: Option<String>,
    is_test_mode: bool,
}

impl From<ProviderConfigRow> for ProviderCredentials {
    fn from(row: ProviderConfigRow) -> Self {
        ProviderCredentials {
            public_key: row.public_key,
            private_key: SecretString::new(row.private_key),
            integrity_secret: row
                .integrity_secret
                .filter(|secret| !secret.is_empty())
                .map(SecretString::new),
            is_test_mode: row.is_test_mode,
        }
    }
}

#[async_trait]
impl ProviderConfigStore for PostgresProviderConfigStore {
    async fn credentials(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
    ) -> Result<Option<ProviderCredentials>, DomainError> {
        let row = sqlx::query_as::<_, ProviderConfigRow>(
            r#"
            SELECT public_key, private_key, integrity_secret, is_test_mode
            FROM provider_configs
            WHERE organization_id = $1 AND provider = $2
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load provider config: {}", e)))?;

        Ok(row.map(ProviderCredentials::from))
    }
}
