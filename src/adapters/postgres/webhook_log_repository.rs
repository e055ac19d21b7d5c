//! PostgreSQL implementation of WebhookLogRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{WebhookLogRecord, WebhookLogRepository};

pub struct PostgresWebhookLogRepository {
    pool: PgPool,
}

impl PostgresWebhookLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookLogRepository for PostgresWebhookLogRepository {
    async fn append(&self, record: &WebhookLogRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_logs (
                id, source, organization_id, event_type, outcome, payload, headers,
                response_status, response_body, error_message, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.source.as_str())
        .bind(record.organization_id.map(|id| *id.as_uuid()))
        .bind(&record.event_type)
        .bind(record.outcome.as_str())
        .bind(&record.payload)
        .bind(&record.headers)
        .bind(i16::try_from(record.response_status).unwrap_or(i16::MAX))
        .bind(&record.response_body)
        .bind(&record.error_message)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append webhook log: {}", e)))?;

        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_logs WHERE received_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to prune webhook logs: {}", e)))?;

        Ok(result.rows_affected())
    }
}
