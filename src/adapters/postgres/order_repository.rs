//! PostgreSQL implementation of OrderRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{FulfillmentStatus, Order, OrderPaymentStatus};
use crate::domain::foundation::{DomainError, OrderId, OrganizationId, Timestamp};
use crate::ports::OrderRepository;

use super::decode;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    organization_id: Uuid,
    payment_status: String,
    fulfillment_status: String,
    payment_reference: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            payment_status: decode::<OrderPaymentStatus>("payment_status", &row.payment_status)?,
            fulfillment_status: decode::<FulfillmentStatus>(
                "fulfillment_status",
                &row.fulfillment_status,
            )?,
            payment_reference: row.payment_reference,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &OrderId,
    ) -> Result<Option<Order>, DomainError> {
        sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, organization_id, payment_status, fulfillment_status, payment_reference, updated_at
            FROM orders
            WHERE organization_id = $1 AND id = $2
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load order: {}", e)))?
        .map(Order::try_from)
        .transpose()
    }

    async fn find_by_payment_reference(
        &self,
        organization_id: &OrganizationId,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, organization_id, payment_status, fulfillment_status, payment_reference, updated_at
            FROM orders
            WHERE organization_id = $1 AND payment_reference = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find order by reference: {}", e)))?
        .map(Order::try_from)
        .transpose()
    }

    async fn compare_and_set_payment_status(
        &self,
        current: &Order,
        next: OrderPaymentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = $3,
                fulfillment_status = CASE
                    WHEN $3 = 'paid' AND fulfillment_status = 'pending' THEN 'confirmed'
                    ELSE fulfillment_status
                END,
                updated_at = now()
            WHERE organization_id = $1 AND id = $2 AND payment_status = $4
            "#,
        )
        .bind(current.organization_id.as_uuid())
        .bind(current.id.as_uuid())
        .bind(next.as_str())
        .bind(current.payment_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update order: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}
