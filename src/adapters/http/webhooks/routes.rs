//! Axum router configuration for webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_messaging_webhook, handle_payment_webhook, health, WebhookAppState};

/// Create the webhook router.
///
/// # Routes
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhooks/payments/:provider?org=<slug>` - Payment provider webhooks
/// - `POST /webhooks/whatsapp` - Messaging webhooks
///
/// ## Operational
/// - `GET /health` - Liveness probe
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/webhooks/payments/:provider", post(handle_payment_webhook))
        .route("/webhooks/whatsapp", post(handle_messaging_webhook))
        .route("/health", get(health))
}
