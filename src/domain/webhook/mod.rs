//! Webhook module - signature verification, payload normalization and the
//! error taxonomy for inbound provider deliveries.
//!
//! # Module Structure
//!
//! - `verifier` - Wompi checksum, ePayco signature, HMAC header scheme
//! - `normalizer` - provider payloads to `PaymentEvent`
//! - `gateway` - per-provider dispatch table
//! - `messaging` - WhatsApp messaging envelopes
//! - `errors` - `WebhookError` and its HTTP mapping

mod credentials;
mod errors;
mod gateway;
mod messaging;
mod normalizer;
pub mod verifier;

pub use credentials::ProviderCredentials;
pub use errors::WebhookError;
pub use gateway::{gateway_for, EpaycoGateway, MetaCloudGateway, ProviderGateway, WompiGateway};
pub use messaging::{MessagingEvent, MessagingEventKind};
pub use normalizer::{
    epayco_status, normalize_epayco, normalize_wompi, parse_minor_units, wompi_status,
    WOMPI_TRANSACTION_EVENT,
};
