//! Messaging (WhatsApp) webhook events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::WebhookError;
use crate::domain::foundation::Timestamp;

/// Kind of event a messaging instance reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingEventKind {
    MessagesUpsert,
    MessagesUpdate,
    ConnectionUpdate,
    QrcodeUpdated,
    Other(String),
}

impl MessagingEventKind {
    /// Parses the wire name. Both `messages.upsert` and `MESSAGES_UPSERT`
    /// spellings are sent depending on the server version.
    pub fn from_wire(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('_', ".");
        match normalized.as_str() {
            "messages.upsert" => Self::MessagesUpsert,
            "messages.update" => Self::MessagesUpdate,
            "connection.update" => Self::ConnectionUpdate,
            "qrcode.updated" => Self::QrcodeUpdated,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::MessagesUpsert => "messages.upsert",
            Self::MessagesUpdate => "messages.update",
            Self::ConnectionUpdate => "connection.update",
            Self::QrcodeUpdated => "qrcode.updated",
            Self::Other(name) => name,
        }
    }
}

/// Normalized `{event, instance, data}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingEvent {
    pub kind: MessagingEventKind,
    /// Messaging instance name; identifies the tenant.
    pub instance: String,
    pub data: Value,
    pub received_at: Timestamp,
}

impl MessagingEvent {
    pub fn from_envelope(payload: &Value, received_at: Timestamp) -> Result<Self, WebhookError> {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingField("event"))?;
        let instance = payload
            .get("instance")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingField("instance"))?;

        Ok(Self {
            kind: MessagingEventKind::from_wire(event),
            instance: instance.to_string(),
            data: payload.get("data").cloned().unwrap_or(Value::Null),
            received_at,
        })
    }
}
