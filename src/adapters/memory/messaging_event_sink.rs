//! In-memory messaging event sink.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::MessagingEvent;
use crate::ports::MessagingEventSink;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMessagingEventSink {
    events: Arc<RwLock<Vec<(OrganizationId, MessagingEvent)>>>,
}

impl InMemoryMessagingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<(OrganizationId, MessagingEvent)> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl MessagingEventSink for InMemoryMessagingEventSink {
    async fn publish(
        &self,
        organization_id: &OrganizationId,
        event: &MessagingEvent,
    ) -> Result<(), DomainError> {
        self.events
            .write()
            .await
            .push((*organization_id, event.clone()));
        Ok(())
    }
}
