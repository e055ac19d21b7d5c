//! Central transition table for payment-driven status changes.
//!
//! Every provider's reconciliation goes through these two functions. The
//! table is keyed by `(current entity status, incoming payment status)`.

use super::status::{OrderPaymentStatus, PaymentStatus, SubscriptionStatus};
use crate::domain::foundation::StateMachine;

/// Outcome of looking up `(current, incoming)` in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Move the entity to this status.
    Apply(S),
    /// Nothing to do: the payment status carries no domain change, or the
    /// entity is already where the payment would put it.
    NoOp,
    /// The entity is terminal and the payment would move it elsewhere.
    IgnoredRegression { current: S, attempted: S },
}

impl<S> Transition<S> {
    pub fn is_apply(&self) -> bool {
        matches!(self, Transition::Apply(_))
    }
}

/// Order status a payment status points at, if any.
pub fn order_target(payment: PaymentStatus) -> Option<OrderPaymentStatus> {
    match payment {
        PaymentStatus::Approved => Some(OrderPaymentStatus::Paid),
        PaymentStatus::Declined | PaymentStatus::Error | PaymentStatus::Voided => {
            Some(OrderPaymentStatus::Failed)
        }
        PaymentStatus::Pending => None,
    }
}

/// Subscription status a payment status points at, if any.
///
/// A voided charge is treated like any other failed charge: the
/// subscription goes past due and is never cancelled from here.
pub fn subscription_target(payment: PaymentStatus) -> Option<SubscriptionStatus> {
    match payment {
        PaymentStatus::Approved => Some(SubscriptionStatus::Active),
        PaymentStatus::Declined | PaymentStatus::Error | PaymentStatus::Voided => {
            Some(SubscriptionStatus::PastDue)
        }
        PaymentStatus::Pending => None,
    }
}

/// Looks up an order transition.
pub fn order_transition(
    current: OrderPaymentStatus,
    payment: PaymentStatus,
) -> Transition<OrderPaymentStatus> {
    resolve(current, order_target(payment), false)
}

/// Looks up a subscription transition.
///
/// `Active -> Active` is a real transition (a renewal), so it is applied
/// rather than folded into `NoOp`.
pub fn subscription_transition(
    current: SubscriptionStatus,
    payment: PaymentStatus,
) -> Transition<SubscriptionStatus> {
    resolve(current, subscription_target(payment), true)
}

fn resolve<S: StateMachine>(current: S, target: Option<S>, self_loops_apply: bool) -> Transition<S> {
    let Some(target) = target else {
        return Transition::NoOp;
    };

    if current == target && !(self_loops_apply && current.can_transition_to(&target)) {
        return Transition::NoOp;
    }

    if current.can_transition_to(&target) {
        Transition::Apply(target)
    } else if current.is_terminal() {
        Transition::IgnoredRegression {
            current,
            attempted: target,
        }
    } else {
        Transition::NoOp
    }
}
