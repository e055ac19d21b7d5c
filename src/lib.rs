//! Payment Webhooks - inbound payment and messaging webhook processing
//!
//! Receives provider callbacks (Wompi, ePayco, WhatsApp), verifies their
//! signatures, and reconciles payment outcomes into orders and
//! subscriptions exactly once per transaction status.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
