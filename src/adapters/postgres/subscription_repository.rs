//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingCycle, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, OrganizationId, SubscriptionId, Timestamp};
use crate::ports::{SubscriptionRepository, SubscriptionUpdate};

use super::decode;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    organization_id: Uuid,
    status: String,
    billing_cycle: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            status: decode::<SubscriptionStatus>("status", &row.status)?,
            billing_cycle: decode::<BillingCycle>("billing_cycle", &row.billing_cycle)?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Escapes `LIKE` metacharacters so a short id only matches literally.
fn like_prefix(short_id: &str) -> String {
    let mut pattern = String::with_capacity(short_id.len() + 1);
    for c in short_id.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, organization_id, status, billing_cycle,
                   current_period_start, current_period_end, updated_at
            FROM subscriptions
            WHERE organization_id = $1 AND id = $2
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn find_by_short_id(
        &self,
        organization_id: &OrganizationId,
        short_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, organization_id, status, billing_cycle,
                   current_period_start, current_period_end, updated_at
            FROM subscriptions
            WHERE organization_id = $1 AND id::text LIKE $2
            LIMIT 10
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(like_prefix(&short_id.to_ascii_lowercase()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscriptions: {}", e)))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn compare_and_set(
        &self,
        current: &Subscription,
        next: &SubscriptionUpdate,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $3,
                current_period_start = $4,
                current_period_end = $5,
                updated_at = now()
            WHERE organization_id = $1 AND id = $2
              AND status = $6 AND current_period_end = $7
            "#,
        )
        .bind(current.organization_id.as_uuid())
        .bind(current.id.as_uuid())
        .bind(next.status.as_str())
        .bind(next.current_period_start.as_datetime())
        .bind(next.current_period_end.as_datetime())
        .bind(current.status.as_str())
        .bind(current.current_period_end.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}
