//! Per-provider capability pair: verify and normalize.
//!
//! The HTTP layer picks a gateway from [`gateway_for`] and never branches on
//! the provider itself.

use axum::http::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::Value;

use super::credentials::ProviderCredentials;
use super::errors::WebhookError;
use super::normalizer::{normalize_epayco, normalize_wompi};
use super::verifier::{
    verify_epayco_signature, verify_hmac_header, verify_wompi_checksum, META_SIGNATURE_HEADER,
};
use crate::domain::billing::{PaymentEvent, Provider};

/// What every payment provider integration supplies.
pub trait ProviderGateway: Send + Sync {
    fn provider(&self) -> Provider;

    /// Event type label for logging and the audit trail.
    fn event_type(&self, payload: &Value) -> Option<String>;

    /// Checks the delivery's signature. Pure; `false` on any problem.
    fn verify(&self, raw_body: &[u8], headers: &HeaderMap, credentials: &ProviderCredentials)
        -> bool;

    /// Maps the payload to a payment event, or `None` when the event needs
    /// no business action.
    fn normalize(&self, payload: &Value) -> Result<Option<PaymentEvent>, WebhookError>;
}

pub struct WompiGateway;

impl ProviderGateway for WompiGateway {
    fn provider(&self) -> Provider {
        Provider::Wompi
    }

    fn event_type(&self, payload: &Value) -> Option<String> {
        payload.get("event").and_then(Value::as_str).map(str::to_string)
    }

    fn verify(&self, raw_body: &[u8], _headers: &HeaderMap, credentials: &ProviderCredentials) -> bool {
        match &credentials.integrity_secret {
            Some(secret) => verify_wompi_checksum(raw_body, secret.expose_secret()),
            None => false,
        }
    }

    fn normalize(&self, payload: &Value) -> Result<Option<PaymentEvent>, WebhookError> {
        normalize_wompi(payload)
    }
}

pub struct EpaycoGateway;

impl ProviderGateway for EpaycoGateway {
    fn provider(&self) -> Provider {
        Provider::Epayco
    }

    fn event_type(&self, payload: &Value) -> Option<String> {
        payload.is_object().then(|| "transaction.confirmation".to_string())
    }

    fn verify(&self, raw_body: &[u8], _headers: &HeaderMap, credentials: &ProviderCredentials) -> bool {
        let Some(p_key) = &credentials.integrity_secret else {
            return false;
        };
        let Ok(payload) = serde_json::from_slice::<Value>(raw_body) else {
            return false;
        };
        verify_epayco_signature(&payload, &credentials.public_key, p_key.expose_secret())
    }

    fn normalize(&self, payload: &Value) -> Result<Option<PaymentEvent>, WebhookError> {
        normalize_epayco(payload)
    }
}

/// WhatsApp Cloud API. Deliveries are authenticated but carry no payments.
pub struct MetaCloudGateway;

impl ProviderGateway for MetaCloudGateway {
    fn provider(&self) -> Provider {
        Provider::MetaCloud
    }

    fn event_type(&self, payload: &Value) -> Option<String> {
        payload.get("object").and_then(Value::as_str).map(str::to_string)
    }

    fn verify(&self, raw_body: &[u8], headers: &HeaderMap, credentials: &ProviderCredentials) -> bool {
        let Some(secret) = &credentials.integrity_secret else {
            return false;
        };
        let Some(header) = headers
            .get(META_SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
        else {
            return false;
        };
        verify_hmac_header(raw_body, header, secret.expose_secret())
    }

    fn normalize(&self, _payload: &Value) -> Result<Option<PaymentEvent>, WebhookError> {
        Ok(None)
    }
}

static WOMPI: WompiGateway = WompiGateway;
static EPAYCO: EpaycoGateway = EpaycoGateway;
static META_CLOUD: MetaCloudGateway = MetaCloudGateway;

/// Dispatch table from provider to its gateway.
pub fn gateway_for(provider: Provider) -> &'static dyn ProviderGateway {
    match provider {
        Provider::Wompi => &WOMPI,
        Provider::Epayco => &EPAYCO,
        Provider::MetaCloud => &META_CLOUD,
    }
}
