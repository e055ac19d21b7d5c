//! MessagingEventSink port - hands accepted messaging events to the
//! collaborators that act on them (inbox, notifications).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::webhook::MessagingEvent;

#[async_trait]
pub trait MessagingEventSink: Send + Sync {
    async fn publish(
        &self,
        organization_id: &OrganizationId,
        event: &MessagingEvent,
    ) -> Result<(), DomainError>;
}
