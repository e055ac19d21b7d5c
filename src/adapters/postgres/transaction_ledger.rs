//! PostgreSQL implementation of TransactionLedger.
//!
//! The upsert is a single `INSERT ... ON CONFLICT DO UPDATE ... WHERE`
//! statement. The `WHERE` clause carries the supersession rule, so a
//! duplicate or regressing delivery updates nothing and returns no row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{PaymentEvent, PaymentOwner, PaymentStatus, Provider, TransactionLedgerRow};
use crate::domain::foundation::{
    DomainError, ErrorCode, LedgerRowId, OrderId, OrganizationId, SubscriptionId, Timestamp,
};
use crate::ports::{LedgerChange, TransactionLedger, UpsertOutcome};

use super::decode;

pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, row_id: &LedgerRowId) -> Result<Option<TransactionLedgerRow>, DomainError> {
        sqlx::query_as::<_, LedgerRow>("SELECT * FROM payment_transactions WHERE id = $1")
            .bind(row_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load ledger row: {}", e)))?
            .map(TransactionLedgerRow::try_from)
            .transpose()
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    organization_id: Uuid,
    provider: String,
    provider_transaction_id: String,
    provider_reference: String,
    order_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    status: String,
    amount_minor_units: i64,
    currency: String,
    raw_response: serde_json::Value,
    applied_status: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row returned by the upsert. `inserted` is `xmax = 0`.
#[derive(Debug, sqlx::FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    ledger: LedgerRow,
    inserted: bool,
}

impl UpsertedRow {
    fn into_outcome(self) -> Result<UpsertOutcome, DomainError> {
        let change = if self.inserted {
            LedgerChange::Inserted
        } else {
            LedgerChange::StatusChanged
        };
        Ok(UpsertOutcome {
            row: self.ledger.try_into()?,
            change,
        })
    }
}

impl TryFrom<LedgerRow> for TransactionLedgerRow {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(TransactionLedgerRow {
            id: LedgerRowId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            provider: decode::<Provider>("provider", &row.provider)?,
            provider_transaction_id: row.provider_transaction_id,
            provider_reference: row.provider_reference,
            order_id: row.order_id.map(OrderId::from_uuid),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            status: decode::<PaymentStatus>("status", &row.status)?,
            amount_minor_units: row.amount_minor_units,
            currency: row.currency,
            raw_response: row.raw_response,
            applied_status: row
                .applied_status
                .as_deref()
                .map(|s| decode::<PaymentStatus>("applied_status", s))
                .transpose()?,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn upsert(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
        owner: Option<PaymentOwner>,
    ) -> Result<UpsertOutcome, DomainError> {
        let now = Utc::now();
        let completed_at = event.status.is_success().then_some(now);

        let upserted = sqlx::query_as::<_, UpsertedRow>(
            r#"
            INSERT INTO payment_transactions AS t (
                id, organization_id, provider, provider_transaction_id, provider_reference,
                order_id, subscription_id, status, amount_minor_units, currency,
                raw_response, completed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            ON CONFLICT (provider, provider_transaction_id) DO UPDATE SET
                status = EXCLUDED.status,
                raw_response = EXCLUDED.raw_response,
                amount_minor_units = EXCLUDED.amount_minor_units,
                currency = EXCLUDED.currency,
                completed_at = COALESCE(t.completed_at, EXCLUDED.completed_at),
                order_id = CASE
                    WHEN t.order_id IS NULL AND t.subscription_id IS NULL THEN EXCLUDED.order_id
                    ELSE t.order_id
                END,
                subscription_id = CASE
                    WHEN t.order_id IS NULL AND t.subscription_id IS NULL THEN EXCLUDED.subscription_id
                    ELSE t.subscription_id
                END,
                updated_at = EXCLUDED.updated_at
            WHERE t.organization_id = EXCLUDED.organization_id
              AND t.status <> EXCLUDED.status
              AND (t.status = 'pending' OR (t.status = 'approved' AND EXCLUDED.status = 'voided'))
            RETURNING t.*, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id.as_uuid())
        .bind(event.provider.as_str())
        .bind(&event.provider_transaction_id)
        .bind(&event.provider_reference)
        .bind(owner.and_then(|o| o.order_id()).map(|id| *id.as_uuid()))
        .bind(owner.and_then(|o| o.subscription_id()).map(|id| *id.as_uuid()))
        .bind(event.status.as_str())
        .bind(event.amount_minor_units)
        .bind(&event.currency)
        .bind(&event.raw_payload)
        .bind(completed_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert ledger row: {}", e)))?;

        if let Some(upserted) = upserted {
            return upserted.into_outcome();
        }

        // Conflict without update: duplicate, regression, or another tenant's row.
        let existing = sqlx::query_as::<_, LedgerRow>(
            "SELECT * FROM payment_transactions WHERE provider = $1 AND provider_transaction_id = $2",
        )
        .bind(event.provider.as_str())
        .bind(&event.provider_transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load ledger row: {}", e)))?;

        if existing.organization_id != *organization_id.as_uuid() {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "transaction belongs to another organization",
            ));
        }

        Ok(UpsertOutcome {
            row: existing.try_into()?,
            change: LedgerChange::Unchanged,
        })
    }

    async fn find_by_transaction(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionLedgerRow>, DomainError> {
        sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT * FROM payment_transactions
            WHERE organization_id = $1 AND provider = $2 AND provider_transaction_id = $3
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(provider.as_str())
        .bind(provider_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find ledger row: {}", e)))?
        .map(TransactionLedgerRow::try_from)
        .transpose()
    }

    async fn link_owner(
        &self,
        row_id: &LedgerRowId,
        owner: PaymentOwner,
    ) -> Result<TransactionLedgerRow, DomainError> {
        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET order_id = $2, subscription_id = $3, updated_at = now()
            WHERE id = $1 AND order_id IS NULL AND subscription_id IS NULL
            "#,
        )
        .bind(row_id.as_uuid())
        .bind(owner.order_id().map(|id| *id.as_uuid()))
        .bind(owner.subscription_id().map(|id| *id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to link ledger row: {}", e)))?;

        self.find_by_id(row_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::LedgerRowNotFound, row_id.to_string()))
    }

    async fn claim_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions SET applied_status = $2
            WHERE id = $1 AND status = $2 AND applied_status IS DISTINCT FROM $2
            "#,
        )
        .bind(row_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to claim transition: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
        previous: Option<PaymentStatus>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE payment_transactions SET applied_status = $3 WHERE id = $1 AND applied_status = $2",
        )
        .bind(row_id.as_uuid())
        .bind(status.as_str())
        .bind(previous.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to release transition: {}", e)))?;

        Ok(())
    }
}
