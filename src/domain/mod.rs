//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machines)
//! - `billing` - Payment statuses, orders, subscriptions, the ledger and transition table
//! - `webhook` - Signature verification, normalization and the webhook error taxonomy

pub mod billing;
pub mod foundation;
pub mod webhook;
