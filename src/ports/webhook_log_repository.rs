//! WebhookLogRepository port - append-only audit trail of webhook deliveries.
//!
//! Every delivery is recorded, whether it was processed, acknowledged
//! without action, or rejected. Operators read these rows to investigate
//! and replay deliveries.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, OrganizationId, Timestamp, WebhookLogId};

/// Endpoint a delivery arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookSource {
    Payment(Provider),
    Messaging,
}

impl WebhookSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookSource::Payment(provider) => provider.as_str(),
            WebhookSource::Messaging => "whatsapp",
        }
    }
}

impl fmt::Display for WebhookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Processed and state reconciled.
    Success,
    /// Understood but needed no action (unknown event type, duplicate).
    Ignored,
    /// Rejected or failed.
    Error,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Success => "success",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Error => "error",
        }
    }
}

/// One audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookLogRecord {
    pub id: WebhookLogId,
    pub source: WebhookSource,
    pub organization_id: Option<OrganizationId>,
    pub event_type: Option<String>,
    pub outcome: WebhookOutcome,
    /// Parsed body, or the raw text wrapped in a JSON string when the body
    /// was not JSON.
    pub payload: serde_json::Value,
    /// Request headers as a JSON object, sensitive values redacted.
    pub headers: serde_json::Value,
    pub response_status: u16,
    pub response_body: serde_json::Value,
    /// Internal error text. Never sent back to the provider.
    pub error_message: Option<String>,
    pub received_at: Timestamp,
}

impl WebhookLogRecord {
    fn new(source: WebhookSource, outcome: WebhookOutcome, payload: serde_json::Value) -> Self {
        Self {
            id: WebhookLogId::new(),
            source,
            organization_id: None,
            event_type: None,
            outcome,
            payload,
            headers: serde_json::Value::Object(Default::default()),
            response_status: 200,
            response_body: serde_json::Value::Null,
            error_message: None,
            received_at: Timestamp::now(),
        }
    }

    /// Creates a record for a processed delivery.
    pub fn success(source: WebhookSource, payload: serde_json::Value) -> Self {
        Self::new(source, WebhookOutcome::Success, payload)
    }

    /// Creates a record for a delivery acknowledged without action.
    pub fn ignored(source: WebhookSource, payload: serde_json::Value) -> Self {
        Self::new(source, WebhookOutcome::Ignored, payload)
    }

    /// Creates a record for a rejected or failed delivery.
    pub fn failed(
        source: WebhookSource,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let mut record = Self::new(source, WebhookOutcome::Error, payload);
        record.error_message = Some(error.into());
        record
    }

    pub fn with_organization(mut self, organization_id: Option<OrganizationId>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_headers(mut self, headers: serde_json::Value) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_response(mut self, status: u16, body: serde_json::Value) -> Self {
        self.response_status = status;
        self.response_body = body;
        self
    }

    pub fn with_received_at(mut self, received_at: Timestamp) -> Self {
        self.received_at = received_at;
        self
    }
}

/// Port for the webhook audit trail.
#[async_trait]
pub trait WebhookLogRepository: Send + Sync {
    /// Appends one record. Records are never updated.
    async fn append(&self, record: &WebhookLogRecord) -> Result<(), DomainError>;

    /// Deletes records received before `cutoff`, for retention.
    ///
    /// Returns the number of records deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
