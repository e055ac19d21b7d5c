//! HTTP DTOs (Data Transfer Objects) for webhook endpoints.
//!
//! Providers only look at the status code; bodies are kept minimal so no
//! internal detail reaches them.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Query string of the payment webhook URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentWebhookQuery {
    /// Organization slug the provider was configured with.
    #[serde(default)]
    pub org: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// `{"received": true}` for every accepted delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceivedResponse {
    pub received: bool,
}

impl ReceivedResponse {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Error body. `error` is a fixed public message, never internal text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn received_response_matches_provider_contract() {
        assert_eq!(serde_json::to_value(ReceivedResponse::ok()).unwrap(), json!({"received": true}));
    }

    #[test]
    fn error_response_serializes_single_field() {
        let value = serde_json::to_value(ErrorResponse::new("Invalid signature")).unwrap();
        assert_eq!(value, json!({"error": "Invalid signature"}));
    }
}
