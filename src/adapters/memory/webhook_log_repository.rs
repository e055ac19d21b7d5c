//! In-memory webhook audit log.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{WebhookLogRecord, WebhookLogRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookLogRepository {
    records: Arc<RwLock<Vec<WebhookLogRecord>>>,
}

impl InMemoryWebhookLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<WebhookLogRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl WebhookLogRepository for InMemoryWebhookLogRepository {
    async fn append(&self, record: &WebhookLogRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !r.received_at.is_before(&cutoff));
        Ok((before - records.len()) as u64)
    }
}
