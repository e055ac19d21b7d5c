//! Webhook error types.
//!
//! Every failure in the webhook pipeline ends up as one of these, and each
//! maps to exactly one HTTP status. The status decides whether the provider
//! redelivers: 2xx and 4xx are final, 5xx is retried.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::billing::Provider;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature or checksum did not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No credentials are configured to verify this provider's webhooks.
    #[error("Provider {0} is not configured for this organization")]
    ProviderNotConfigured(Provider),

    /// Provider path segment is not one we accept.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Organization slug or messaging instance did not resolve.
    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    /// Body is not valid JSON or has the wrong shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Reference does not correspond to any order or subscription.
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    /// Reference short id matched more than one subscription.
    #[error("Reference is ambiguous: {0}")]
    ReferenceAmbiguous(String),

    /// Storage failed; the provider must redeliver.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    ///
    /// Redelivery is safe because reconciliation is idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::PersistenceFailure(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::ProviderNotConfigured(_) => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::UnsupportedProvider(_) | WebhookError::UnknownOrganization(_) => {
                StatusCode::NOT_FOUND
            }

            WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_)
            | WebhookError::ReferenceNotFound(_)
            | WebhookError::ReferenceAmbiguous(_) => StatusCode::BAD_REQUEST,

            WebhookError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to put in a response body.
    ///
    /// Never includes references, ids, SQL errors or secrets.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature | WebhookError::ProviderNotConfigured(_) => {
                "Invalid signature"
            }
            WebhookError::UnsupportedProvider(_) => "Unsupported provider",
            WebhookError::UnknownOrganization(_) => "Unknown organization",
            WebhookError::MalformedPayload(_) | WebhookError::MissingField(_) => {
                "Malformed payload"
            }
            WebhookError::ReferenceNotFound(_) | WebhookError::ReferenceAmbiguous(_) => {
                "Unresolvable reference"
            }
            WebhookError::PersistenceFailure(_) => "Internal error",
        }
    }
}

/// Port failures are storage failures from the webhook's point of view,
/// except validation failures, which no redelivery can fix.
impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => WebhookError::MalformedPayload(err.message),
            _ => WebhookError::PersistenceFailure(err.to_string()),
        }
    }
}
