//! PaymentReconciler - turns a verified, normalized payment event into a
//! durable, idempotent state change.
//!
//! # Flow
//!
//! 1. Resolve the owning order or subscription (read-only).
//! 2. Upsert the ledger row keyed by `(provider, provider_transaction_id)`.
//!    An unresolvable reference still records the row, unlinked, and then
//!    reports `ReferenceNotFound`.
//! 3. Claim the row's current status. Only one caller per status wins, so
//!    duplicate and concurrent deliveries apply their effect at most once.
//! 4. Look up `(current entity status, payment status)` in the transition
//!    table and write the result with compare-and-swap, reloading on a miss.
//!
//! A failure in step 4 releases the claim and surfaces as a persistence
//! failure, so the provider's redelivery can finish the job.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{
    order_target, order_transition, subscription_target, subscription_transition, Order,
    OrderPaymentStatus, PaymentEvent, PaymentOwner, PaymentStatus, Subscription,
    SubscriptionStatus, TransactionLedgerRow, Transition,
};
use crate::domain::foundation::{LedgerRowId, OrderId, OrganizationId, SubscriptionId, Timestamp};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    LedgerChange, OrderRepository, SubscriptionRepository, SubscriptionUpdate, TransactionLedger,
};

use super::reference_resolver::ReferenceResolver;

/// Default number of compare-and-swap attempts per transition.
pub const DEFAULT_MAX_TRANSITION_ATTEMPTS: u32 = 3;

/// Status of whatever the transaction ended up attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", content = "status", rename_all = "snake_case")]
pub enum FinalStatus {
    Order(OrderPaymentStatus),
    Subscription(SubscriptionStatus),
}

/// Outcome handed to collaborators (notifications, dashboards).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileResult {
    pub ledger_row_id: LedgerRowId,
    pub domain_entity: Option<PaymentOwner>,
    /// True only for the delivery whose transition actually committed.
    pub transition_applied: bool,
    pub final_status: FinalStatus,
    /// Ledger status after this delivery.
    pub payment_status: PaymentStatus,
    #[serde(skip)]
    pub ledger_change: LedgerChange,
}

/// What happened to the owning entity.
struct EntityOutcome {
    applied: bool,
    status: FinalStatus,
}

pub struct PaymentReconciler {
    resolver: ReferenceResolver,
    ledger: Arc<dyn TransactionLedger>,
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    max_attempts: u32,
}

impl PaymentReconciler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        orders: Arc<dyn OrderRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            resolver: ReferenceResolver::new(orders.clone(), subscriptions.clone(), ledger.clone()),
            ledger,
            orders,
            subscriptions,
            max_attempts: DEFAULT_MAX_TRANSITION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[tracing::instrument(
        skip(self, event),
        fields(
            provider = %event.provider,
            provider_transaction_id = %event.provider_transaction_id,
            payment_status = %event.status,
        )
    )]
    pub async fn reconcile(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
    ) -> Result<ReconcileResult, WebhookError> {
        let (resolved, unresolved) = match self.resolver.resolve(organization_id, event).await {
            Ok(owner) => (Some(owner), None),
            Err(err @ (WebhookError::ReferenceNotFound(_) | WebhookError::ReferenceAmbiguous(_))) => {
                (None, Some(err))
            }
            Err(err) => return Err(err),
        };

        let outcome = self.ledger.upsert(organization_id, event, resolved).await?;
        tracing::debug!(change = ?outcome.change, ledger_row_id = %outcome.row.id, "Ledger upserted");

        let row = self.linked_row(outcome.row, resolved).await?;
        let owner = match (owner_of(&row), unresolved) {
            (Some(owner), _) => owner,
            (None, Some(err)) => {
                tracing::error!(
                    reference = %event.provider_reference,
                    ledger_row_id = %row.id,
                    error = %err,
                    "Payment reference did not resolve; ledger row recorded unlinked"
                );
                return Err(err);
            }
            (None, None) => {
                return Err(WebhookError::ReferenceNotFound(
                    event.provider_reference.clone(),
                ))
            }
        };

        let entity = self.apply(organization_id, &row, owner).await?;

        Ok(ReconcileResult {
            ledger_row_id: row.id,
            domain_entity: Some(owner),
            transition_applied: entity.applied,
            final_status: entity.status,
            payment_status: row.status,
            ledger_change: outcome.change,
        })
    }

    /// Links a previously unlinked row to the owner resolved this time.
    async fn linked_row(
        &self,
        row: TransactionLedgerRow,
        resolved: Option<PaymentOwner>,
    ) -> Result<TransactionLedgerRow, WebhookError> {
        match (owner_of(&row), resolved) {
            (None, Some(owner)) => Ok(self.ledger.link_owner(&row.id, owner).await?),
            (Some(linked), Some(owner)) if linked != owner => {
                tracing::warn!(
                    ledger_row_id = %row.id,
                    linked = ?linked,
                    resolved = ?owner,
                    "Reference now resolves elsewhere; keeping the original link"
                );
                Ok(row)
            }
            _ => Ok(row),
        }
    }

    async fn apply(
        &self,
        organization_id: &OrganizationId,
        row: &TransactionLedgerRow,
        owner: PaymentOwner,
    ) -> Result<EntityOutcome, WebhookError> {
        let has_target = match owner {
            PaymentOwner::Order(_) => order_target(row.status).is_some(),
            PaymentOwner::Subscription(_) => subscription_target(row.status).is_some(),
        };

        let claimed = has_target && self.ledger.claim_transition(&row.id, row.status).await?;
        if !claimed {
            tracing::debug!(ledger_row_id = %row.id, status = %row.status, "No transition to apply");
            return self.current_status(organization_id, owner).await;
        }

        let applied = match owner {
            PaymentOwner::Order(id) => self.apply_order(organization_id, &id, row.status).await,
            PaymentOwner::Subscription(id) => {
                self.apply_subscription(organization_id, &id, row.status).await
            }
        };

        if let Err(err) = &applied {
            tracing::warn!(ledger_row_id = %row.id, error = %err, "Transition failed; releasing claim");
            if let Err(release_err) = self
                .ledger
                .release_transition(&row.id, row.status, row.applied_status)
                .await
            {
                tracing::error!(ledger_row_id = %row.id, error = %release_err, "Failed to release transition claim");
            }
        }
        applied
    }

    async fn current_status(
        &self,
        organization_id: &OrganizationId,
        owner: PaymentOwner,
    ) -> Result<EntityOutcome, WebhookError> {
        let status = match owner {
            PaymentOwner::Order(id) => {
                FinalStatus::Order(self.load_order(organization_id, &id).await?.payment_status)
            }
            PaymentOwner::Subscription(id) => FinalStatus::Subscription(
                self.load_subscription(organization_id, &id).await?.status,
            ),
        };
        Ok(EntityOutcome {
            applied: false,
            status,
        })
    }

    async fn load_order(
        &self,
        organization_id: &OrganizationId,
        id: &OrderId,
    ) -> Result<Order, WebhookError> {
        self.orders
            .find_by_id(organization_id, id)
            .await?
            .ok_or_else(|| WebhookError::ReferenceNotFound(id.to_string()))
    }

    async fn load_subscription(
        &self,
        organization_id: &OrganizationId,
        id: &SubscriptionId,
    ) -> Result<Subscription, WebhookError> {
        self.subscriptions
            .find_by_id(organization_id, id)
            .await?
            .ok_or_else(|| WebhookError::ReferenceNotFound(id.to_string()))
    }

    async fn apply_order(
        &self,
        organization_id: &OrganizationId,
        id: &OrderId,
        payment: PaymentStatus,
    ) -> Result<EntityOutcome, WebhookError> {
        for attempt in 1..=self.max_attempts {
            let order = self.load_order(organization_id, id).await?;

            match order_transition(order.payment_status, payment) {
                Transition::Apply(next) => {
                    if self.orders.compare_and_set_payment_status(&order, next).await? {
                        tracing::info!(order_id = %id, from = %order.payment_status.as_str(), to = %next.as_str(), "Order payment status updated");
                        return Ok(EntityOutcome {
                            applied: true,
                            status: FinalStatus::Order(next),
                        });
                    }
                    tracing::debug!(order_id = %id, attempt, "Order changed concurrently; retrying");
                }
                Transition::NoOp => {
                    return Ok(EntityOutcome {
                        applied: false,
                        status: FinalStatus::Order(order.payment_status),
                    });
                }
                Transition::IgnoredRegression { current, attempted } => {
                    tracing::info!(order_id = %id, current = %current.as_str(), attempted = %attempted.as_str(), "Ignored regression of terminal order");
                    return Ok(EntityOutcome {
                        applied: false,
                        status: FinalStatus::Order(current),
                    });
                }
            }
        }

        Err(WebhookError::PersistenceFailure(format!(
            "order {} kept changing after {} attempts",
            id, self.max_attempts
        )))
    }

    async fn apply_subscription(
        &self,
        organization_id: &OrganizationId,
        id: &SubscriptionId,
        payment: PaymentStatus,
    ) -> Result<EntityOutcome, WebhookError> {
        for attempt in 1..=self.max_attempts {
            let subscription = self.load_subscription(organization_id, id).await?;

            let next = match subscription_transition(subscription.status, payment) {
                Transition::Apply(SubscriptionStatus::Active) => {
                    let (start, end) = subscription.renewed_period(Timestamp::now());
                    SubscriptionUpdate {
                        status: SubscriptionStatus::Active,
                        current_period_start: start,
                        current_period_end: end,
                    }
                }
                Transition::Apply(status) => SubscriptionUpdate {
                    status,
                    current_period_start: subscription.current_period_start,
                    current_period_end: subscription.current_period_end,
                },
                Transition::NoOp => {
                    return Ok(EntityOutcome {
                        applied: false,
                        status: FinalStatus::Subscription(subscription.status),
                    });
                }
                Transition::IgnoredRegression { current, attempted } => {
                    tracing::info!(subscription_id = %id, current = %current.as_str(), attempted = %attempted.as_str(), "Ignored regression of terminal subscription");
                    return Ok(EntityOutcome {
                        applied: false,
                        status: FinalStatus::Subscription(current),
                    });
                }
            };

            if self.subscriptions.compare_and_set(&subscription, &next).await? {
                tracing::info!(
                    subscription_id = %id,
                    from = %subscription.status.as_str(),
                    to = %next.status.as_str(),
                    period_end = %next.current_period_end,
                    "Subscription updated"
                );
                return Ok(EntityOutcome {
                    applied: true,
                    status: FinalStatus::Subscription(next.status),
                });
            }
            tracing::debug!(subscription_id = %id, attempt, "Subscription changed concurrently; retrying");
        }

        Err(WebhookError::PersistenceFailure(format!(
            "subscription {} kept changing after {} attempts",
            id, self.max_attempts
        )))
    }
}

fn owner_of(row: &TransactionLedgerRow) -> Option<PaymentOwner> {
    row.order_id
        .map(PaymentOwner::Order)
        .or_else(|| row.subscription_id.map(PaymentOwner::Subscription))
}
