//! Billing module - payment statuses, the entities they drive, and the
//! transition table that connects the two.

mod entities;
mod event;
mod provider;
mod reference;
mod status;
mod transitions;

pub use entities::{Order, PaymentOwner, Subscription, TransactionLedgerRow};
pub use event::PaymentEvent;
pub use provider::Provider;
pub use reference::{OrderReference, SubscriptionReference};
pub use status::{
    BillingCycle, FulfillmentStatus, OrderPaymentStatus, PaymentStatus, SubscriptionStatus,
};
pub use transitions::{
    order_target, order_transition, subscription_target, subscription_transition, Transition,
};
