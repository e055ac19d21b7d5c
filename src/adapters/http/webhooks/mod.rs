//! HTTP adapter for webhook endpoints.
//!
//! Exposes the webhook pipeline to providers:
//! - `POST /webhooks/payments/:provider?org=<slug>` - Wompi, ePayco, Meta Cloud
//! - `POST /webhooks/whatsapp` - WhatsApp messaging events
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{WebhookApiError, WebhookAppState, WebhookSettings};
pub use routes::webhook_router;
