//! HandleMessagingWebhookHandler - Command handler for WhatsApp messaging
//! webhooks.
//!
//! Signature checking is opt-in: with neither a deployment secret nor a
//! tenant secret configured, unsigned deliveries are accepted.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::domain::billing::Provider;
use crate::domain::foundation::{OrganizationId, Timestamp};
use crate::domain::webhook::verifier::{verify_optional_hmac_header, MESSAGING_SIGNATURE_HEADER};
use crate::domain::webhook::{MessagingEvent, MessagingEventKind, WebhookError};
use crate::ports::{
    MessagingEventSink, OrganizationDirectory, ProviderConfigStore, WebhookLogRecord,
    WebhookSource,
};

use super::audit::{payload_value, AuditLogger};
use super::handle_payment_webhook::acknowledgement;

/// Command to handle one messaging webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleMessagingWebhookCommand {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub received_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandleMessagingWebhookResult {
    /// Event delivered to the messaging sink.
    Accepted {
        organization_id: OrganizationId,
        kind: MessagingEventKind,
    },
    /// No organization owns the instance; acknowledged and dropped.
    Ignored { instance: String },
}

pub struct HandleMessagingWebhookHandler {
    directory: Arc<dyn OrganizationDirectory>,
    credentials: Arc<dyn ProviderConfigStore>,
    sink: Arc<dyn MessagingEventSink>,
    audit: AuditLogger,
    deployment_secret: Option<SecretString>,
}

impl HandleMessagingWebhookHandler {
    pub fn new(
        directory: Arc<dyn OrganizationDirectory>,
        credentials: Arc<dyn ProviderConfigStore>,
        sink: Arc<dyn MessagingEventSink>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            directory,
            credentials,
            sink,
            audit,
            deployment_secret: None,
        }
    }

    /// Secret that applies to every tenant, taking precedence over
    /// per-tenant secrets.
    pub fn with_deployment_secret(mut self, secret: Option<SecretString>) -> Self {
        self.deployment_secret = secret;
        self
    }

    #[tracing::instrument(skip(self, cmd))]
    pub async fn handle(
        &self,
        cmd: HandleMessagingWebhookCommand,
    ) -> Result<HandleMessagingWebhookResult, WebhookError> {
        let mut organization_id = None;
        let mut event_type = None;
        let outcome = self
            .process(&cmd, &mut organization_id, &mut event_type)
            .await;

        let payload = payload_value(&cmd.body);
        let record = match &outcome {
            Ok(HandleMessagingWebhookResult::Accepted { .. }) => {
                WebhookLogRecord::success(WebhookSource::Messaging, payload)
                    .with_response(200, acknowledgement())
            }
            Ok(HandleMessagingWebhookResult::Ignored { .. }) => {
                WebhookLogRecord::ignored(WebhookSource::Messaging, payload)
                    .with_response(200, acknowledgement())
            }
            Err(err) => WebhookLogRecord::failed(WebhookSource::Messaging, err.to_string(), payload)
                .with_response(
                    err.status_code().as_u16(),
                    json!({ "error": err.public_message() }),
                ),
        };
        self.audit
            .record(
                record
                    .with_organization(organization_id)
                    .with_event_type(event_type)
                    .with_headers(self.audit.redact_headers(&cmd.headers))
                    .with_received_at(cmd.received_at),
            )
            .await;

        outcome
    }

    async fn process(
        &self,
        cmd: &HandleMessagingWebhookCommand,
        organization_id: &mut Option<OrganizationId>,
        event_type: &mut Option<String>,
    ) -> Result<HandleMessagingWebhookResult, WebhookError> {
        // A deployment secret covers every tenant, so the raw body is checked
        // before anything in it is trusted.
        if let Some(secret) = &self.deployment_secret {
            check_signature(cmd, Some(secret))?;
        }

        let payload: Value = serde_json::from_slice(&cmd.body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let event = MessagingEvent::from_envelope(&payload, cmd.received_at)?;
        *event_type = Some(event.kind.as_str().to_string());

        let tenant = self
            .directory
            .find_by_messaging_instance(&event.instance)
            .await?;
        *organization_id = tenant;

        let Some(tenant) = tenant else {
            tracing::debug!(instance = %event.instance, "No organization owns this messaging instance");
            return Ok(HandleMessagingWebhookResult::Ignored {
                instance: event.instance,
            });
        };

        if self.deployment_secret.is_none() {
            let secret = self.tenant_secret(&tenant).await?;
            check_signature(cmd, secret.as_ref())?;
        }

        self.sink.publish(&tenant, &event).await?;
        tracing::debug!(organization_id = %tenant, kind = event.kind.as_str(), "Messaging event accepted");

        Ok(HandleMessagingWebhookResult::Accepted {
            organization_id: tenant,
            kind: event.kind,
        })
    }

    async fn tenant_secret(
        &self,
        tenant: &OrganizationId,
    ) -> Result<Option<SecretString>, WebhookError> {
        Ok(self
            .credentials
            .credentials(tenant, Provider::MetaCloud)
            .await?
            .and_then(|credentials| credentials.integrity_secret))
    }
}

fn check_signature(
    cmd: &HandleMessagingWebhookCommand,
    secret: Option<&SecretString>,
) -> Result<(), WebhookError> {
    let header = cmd
        .headers
        .get(MESSAGING_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let verified = verify_optional_hmac_header(
        &cmd.body,
        header,
        secret.map(|s| s.expose_secret().as_str()),
    );
    if !verified {
        tracing::warn!(signed = header.is_some(), "Messaging webhook signature verification failed");
        return Err(WebhookError::InvalidSignature);
    }
    Ok(())
}
