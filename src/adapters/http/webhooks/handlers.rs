//! HTTP handlers for webhook endpoints.
//!
//! These handlers connect axum routes to the application layer handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;

use crate::application::handlers::webhook::{
    AuditLogger, HandleMessagingWebhookCommand, HandleMessagingWebhookHandler,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, PaymentReconciler,
    DEFAULT_MAX_TRANSITION_ATTEMPTS,
};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::WebhookError;
use crate::ports::{
    MessagingEventSink, OrderRepository, OrganizationDirectory, ProviderConfigStore,
    SubscriptionRepository, TransactionLedger, WebhookLogRepository,
};

use super::dto::{ErrorResponse, HealthResponse, PaymentWebhookQuery, ReceivedResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Knobs that shape webhook handling, taken from configuration.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Deployment-wide secret for the messaging webhook.
    pub messaging_secret: Option<SecretString>,
    pub max_transition_attempts: u32,
    /// Extra header names redacted from audit records.
    pub redacted_headers: Vec<String>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            messaging_secret: None,
            max_transition_attempts: DEFAULT_MAX_TRANSITION_ATTEMPTS,
            redacted_headers: Vec::new(),
        }
    }
}

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is Arc-wrapped.
#[derive(Clone)]
pub struct WebhookAppState {
    pub ledger: Arc<dyn TransactionLedger>,
    pub orders: Arc<dyn OrderRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub provider_configs: Arc<dyn ProviderConfigStore>,
    pub organizations: Arc<dyn OrganizationDirectory>,
    pub webhook_logs: Arc<dyn WebhookLogRepository>,
    pub messaging_sink: Arc<dyn MessagingEventSink>,
    pub settings: WebhookSettings,
}

impl WebhookAppState {
    pub fn audit_logger(&self) -> AuditLogger {
        AuditLogger::new(self.webhook_logs.clone())
            .with_redacted_headers(&self.settings.redacted_headers)
    }

    pub fn payment_handler(&self) -> HandlePaymentWebhookHandler {
        let reconciler = PaymentReconciler::new(
            self.ledger.clone(),
            self.orders.clone(),
            self.subscriptions.clone(),
        )
        .with_max_attempts(self.settings.max_transition_attempts);

        HandlePaymentWebhookHandler::new(
            self.organizations.clone(),
            self.provider_configs.clone(),
            Arc::new(reconciler),
            self.audit_logger(),
        )
    }

    pub fn messaging_handler(&self) -> HandleMessagingWebhookHandler {
        HandleMessagingWebhookHandler::new(
            self.organizations.clone(),
            self.provider_configs.clone(),
            self.messaging_sink.clone(),
            self.audit_logger(),
        )
        .with_deployment_secret(self.settings.messaging_secret.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payments/:provider?org=<slug>
pub async fn handle_payment_webhook(
    State(state): State<WebhookAppState>,
    Path(provider): Path<String>,
    Query(query): Query<PaymentWebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReceivedResponse>, WebhookApiError> {
    let cmd = HandlePaymentWebhookCommand {
        provider,
        organization_slug: query.org,
        headers,
        body,
        received_at: Timestamp::now(),
    };

    state.payment_handler().handle(cmd).await?;
    Ok(Json(ReceivedResponse::ok()))
}

/// POST /webhooks/whatsapp
pub async fn handle_messaging_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReceivedResponse>, WebhookApiError> {
    let cmd = HandleMessagingWebhookCommand {
        headers,
        body,
        received_at: Timestamp::now(),
    };

    state.messaging_handler().handle(cmd).await?;
    Ok(Json(ReceivedResponse::ok()))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        (status, Json(ErrorResponse::new(self.0.public_message()))).into_response()
    }
}
