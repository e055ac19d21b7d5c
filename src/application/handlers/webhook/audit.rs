//! AuditLogger - best-effort durable record of every webhook delivery.
//!
//! A failed audit write is logged and swallowed. It never changes the
//! response the provider gets.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::domain::foundation::Timestamp;
use crate::ports::{WebhookLogRecord, WebhookLogRepository};

/// Placeholder stored instead of a redacted header value.
pub const REDACTED: &str = "[REDACTED]";

/// Headers that are always redacted, whatever the configuration says.
const ALWAYS_REDACTED: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

#[derive(Clone)]
pub struct AuditLogger {
    repository: Arc<dyn WebhookLogRepository>,
    redacted: HashSet<String>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn WebhookLogRepository>) -> Self {
        Self {
            repository,
            redacted: ALWAYS_REDACTED.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Adds header names whose values are never stored. Case-insensitive.
    pub fn with_redacted_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.redacted
            .extend(headers.into_iter().map(|h| h.as_ref().trim().to_ascii_lowercase()));
        self
    }

    /// Request headers as a JSON object with sensitive values replaced.
    ///
    /// Repeated headers keep their last value. Non-UTF-8 values are stored
    /// lossily.
    pub fn redact_headers(&self, headers: &HeaderMap) -> Value {
        let mut object = Map::new();
        for (name, value) in headers {
            let name = name.as_str();
            let value = if self.redacted.contains(name) {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            object.insert(name.to_string(), Value::String(value));
        }
        Value::Object(object)
    }

    /// Appends `record`. Failures are logged, never returned.
    pub async fn record(&self, record: WebhookLogRecord) {
        if let Err(err) = self.repository.append(&record).await {
            tracing::warn!(
                source = %record.source,
                outcome = record.outcome.as_str(),
                error = %err,
                "Failed to write webhook audit record"
            );
        }
    }

    /// Deletes records received more than `retention_days` before `now`.
    ///
    /// Returns the number deleted; failures are logged and count as zero.
    pub async fn prune(&self, now: Timestamp, retention_days: u32) -> u64 {
        let cutoff = now.add_days(-i64::from(retention_days));
        match self.repository.delete_before(cutoff).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, retention_days, "Pruned webhook audit records");
                }
                deleted
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to prune webhook audit records");
                0
            }
        }
    }
}

/// Body as stored in the audit trail: parsed JSON, or the raw text when the
/// body is not JSON.
pub fn payload_value(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
