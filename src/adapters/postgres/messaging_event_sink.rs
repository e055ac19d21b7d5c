//! PostgreSQL implementation of MessagingEventSink.
//!
//! Accepted events are written to `messaging_events`; the inbox consumes
//! rows where `processed_at` is null.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::MessagingEvent;
use crate::ports::MessagingEventSink;

pub struct PostgresMessagingEventSink {
    pool: PgPool,
}

impl PostgresMessagingEventSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessagingEventSink for PostgresMessagingEventSink {
    async fn publish(
        &self,
        organization_id: &OrganizationId,
        event: &MessagingEvent,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messaging_events (id, organization_id, kind, instance, data, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id.as_uuid())
        .bind(event.kind.as_str())
        .bind(&event.instance)
        .bind(&event.data)
        .bind(event.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to store messaging event: {}", e)))?;

        Ok(())
    }
}
