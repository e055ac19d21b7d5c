//! HandlePaymentWebhookHandler - Command handler for payment provider webhooks.
//!
//! Resolves the tenant, verifies the delivery with the tenant's credentials,
//! normalizes the payload and hands the event to the reconciler. Every
//! delivery with a recognized provider ends in exactly one audit record.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::domain::billing::Provider;
use crate::domain::foundation::{OrganizationId, Timestamp};
use crate::domain::webhook::{gateway_for, WebhookError};
use crate::ports::{OrganizationDirectory, ProviderConfigStore, WebhookLogRecord, WebhookSource};

use super::audit::{payload_value, AuditLogger};
use super::reconcile_payment::{PaymentReconciler, ReconcileResult};

/// Command to handle one payment webhook delivery.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Provider path segment, as received.
    pub provider: String,
    /// `?org=` query parameter.
    pub organization_slug: Option<String>,
    pub headers: HeaderMap,
    /// Raw body. Signatures are computed over these exact bytes.
    pub body: Bytes,
    pub received_at: Timestamp,
}

/// Result of a delivery the provider should see as successful.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlePaymentWebhookResult {
    /// A payment event was reconciled (possibly as a no-op duplicate).
    Reconciled(ReconcileResult),
    /// Verified, but the event type carries no payment.
    Acknowledged { event_type: Option<String> },
}

/// Body returned to the provider for every 200 response.
pub fn acknowledgement() -> Value {
    json!({ "received": true })
}

/// What was learned about a delivery before it finished or failed.
#[derive(Debug, Default)]
struct DeliveryContext {
    organization_id: Option<OrganizationId>,
    event_type: Option<String>,
}

pub struct HandlePaymentWebhookHandler {
    directory: Arc<dyn OrganizationDirectory>,
    credentials: Arc<dyn ProviderConfigStore>,
    reconciler: Arc<PaymentReconciler>,
    audit: AuditLogger,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        directory: Arc<dyn OrganizationDirectory>,
        credentials: Arc<dyn ProviderConfigStore>,
        reconciler: Arc<PaymentReconciler>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            directory,
            credentials,
            reconciler,
            audit,
        }
    }

    #[tracing::instrument(
        skip(self, cmd),
        fields(provider = %cmd.provider, org = ?cmd.organization_slug)
    )]
    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let provider: Provider = cmd.provider.parse().map_err(|_| {
            tracing::warn!("Webhook for unsupported provider");
            WebhookError::UnsupportedProvider(cmd.provider.clone())
        })?;

        let mut context = DeliveryContext::default();
        let outcome = self.process(provider, &cmd, &mut context).await;
        self.audit
            .record(self.audit_record(provider, &cmd, context, &outcome))
            .await;
        outcome
    }

    async fn process(
        &self,
        provider: Provider,
        cmd: &HandlePaymentWebhookCommand,
        context: &mut DeliveryContext,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Tenant
        let slug = cmd
            .organization_slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .ok_or(WebhookError::MissingField("org"))?;
        let organization_id = self
            .directory
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| WebhookError::UnknownOrganization(slug.to_string()))?;
        context.organization_id = Some(organization_id);

        // 2. Credentials and signature
        let credentials = self
            .credentials
            .credentials(&organization_id, provider)
            .await?
            .ok_or_else(|| {
                tracing::warn!(organization_id = %organization_id, "Provider not configured; rejecting webhook");
                WebhookError::ProviderNotConfigured(provider)
            })?;

        let gateway = gateway_for(provider);
        if !gateway.verify(&cmd.body, &cmd.headers, &credentials) {
            tracing::warn!(organization_id = %organization_id, "Webhook signature verification failed");
            return Err(WebhookError::InvalidSignature);
        }

        // 3. Normalize
        let payload: Value = serde_json::from_slice(&cmd.body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        context.event_type = gateway.event_type(&payload);

        let Some(event) = gateway.normalize(&payload)? else {
            tracing::debug!(event_type = ?context.event_type, "Event carries no payment; acknowledging");
            return Ok(HandlePaymentWebhookResult::Acknowledged {
                event_type: context.event_type.clone(),
            });
        };

        // 4. Reconcile
        let result = self
            .reconciler
            .reconcile(&organization_id, &event)
            .await
            .map_err(|err| {
                if err.is_retryable() {
                    tracing::error!(error = %err, "Reconciliation failed; provider will redeliver");
                }
                err
            })?;

        if result.transition_applied {
            tracing::info!(
                ledger_row_id = %result.ledger_row_id,
                payment_status = %result.payment_status,
                test_mode = credentials.is_test_mode,
                "Payment webhook reconciled"
            );
        } else {
            tracing::debug!(ledger_row_id = %result.ledger_row_id, "Payment webhook produced no transition");
        }

        Ok(HandlePaymentWebhookResult::Reconciled(result))
    }

    fn audit_record(
        &self,
        provider: Provider,
        cmd: &HandlePaymentWebhookCommand,
        context: DeliveryContext,
        outcome: &Result<HandlePaymentWebhookResult, WebhookError>,
    ) -> WebhookLogRecord {
        let source = WebhookSource::Payment(provider);
        let payload = payload_value(&cmd.body);

        let record = match outcome {
            Ok(HandlePaymentWebhookResult::Reconciled(_)) => {
                WebhookLogRecord::success(source, payload).with_response(200, acknowledgement())
            }
            Ok(HandlePaymentWebhookResult::Acknowledged { .. }) => {
                WebhookLogRecord::ignored(source, payload).with_response(200, acknowledgement())
            }
            Err(err) => WebhookLogRecord::failed(source, err.to_string(), payload).with_response(
                err.status_code().as_u16(),
                json!({ "error": err.public_message() }),
            ),
        };

        record
            .with_organization(context.organization_id)
            .with_event_type(context.event_type)
            .with_headers(self.audit.redact_headers(&cmd.headers))
            .with_received_at(cmd.received_at)
    }
}
