//! ReferenceResolver - maps a provider reference back to the order or
//! subscription it pays for.
//!
//! Subscription references are parsed for their short id, then every
//! candidate is exact-matched. Order references carry no structure and are
//! matched by equality against the reference stored on the order.

use std::sync::Arc;

use crate::domain::billing::{PaymentEvent, PaymentOwner, Provider, SubscriptionReference};
use crate::domain::foundation::{OrganizationId, SubscriptionId};
use crate::domain::webhook::WebhookError;
use crate::ports::{OrderRepository, SubscriptionRepository, TransactionLedger};

/// One way of finding the order a transaction pays for, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    /// Order whose stored payment reference equals this value.
    ByReference(String),
    /// Order already linked to an earlier ledger row for the same transaction.
    ByTransaction {
        provider: Provider,
        provider_transaction_id: String,
    },
}

/// Lookup keys for an order-linked transaction, most specific first.
pub fn order_lookups(reference: &str, provider: Provider, provider_transaction_id: &str) -> [OrderLookup; 2] {
    [
        OrderLookup::ByReference(reference.to_string()),
        OrderLookup::ByTransaction {
            provider,
            provider_transaction_id: provider_transaction_id.to_string(),
        },
    ]
}

pub struct ReferenceResolver {
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    ledger: Arc<dyn TransactionLedger>,
}

impl ReferenceResolver {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            orders,
            subscriptions,
            ledger,
        }
    }

    /// Resolves the owner of `event`. Read-only.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if nothing matches
    /// - `ReferenceAmbiguous` if a subscription short id matches more than once
    /// - `PersistenceFailure` if a lookup fails
    pub async fn resolve(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
    ) -> Result<PaymentOwner, WebhookError> {
        if SubscriptionReference::is_subscription_reference(&event.provider_reference) {
            self.resolve_subscription_id(organization_id, &event.provider_reference)
                .await
                .map(PaymentOwner::Subscription)
        } else {
            self.resolve_order(organization_id, event).await
        }
    }

    /// Resolves a `SUB-...` reference to the one subscription it names.
    pub async fn resolve_subscription_id(
        &self,
        organization_id: &OrganizationId,
        reference: &str,
    ) -> Result<SubscriptionId, WebhookError> {
        let parsed = SubscriptionReference::parse(reference)
            .map_err(|_| WebhookError::ReferenceNotFound(reference.to_string()))?;

        let candidates = self
            .subscriptions
            .find_by_short_id(organization_id, parsed.short_id())
            .await?;

        let mut matching = candidates.iter().filter(|s| parsed.matches(&s.id));
        match (matching.next(), matching.next()) {
            (Some(subscription), None) => Ok(subscription.id),
            (Some(_), Some(_)) => Err(WebhookError::ReferenceAmbiguous(reference.to_string())),
            (None, _) => Err(WebhookError::ReferenceNotFound(reference.to_string())),
        }
    }

    async fn resolve_order(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
    ) -> Result<PaymentOwner, WebhookError> {
        let lookups = order_lookups(
            &event.provider_reference,
            event.provider,
            &event.provider_transaction_id,
        );

        for lookup in lookups {
            let found = match lookup {
                OrderLookup::ByReference(reference) => self
                    .orders
                    .find_by_payment_reference(organization_id, &reference)
                    .await?
                    .map(|order| order.id),
                OrderLookup::ByTransaction {
                    provider,
                    provider_transaction_id,
                } => self
                    .ledger
                    .find_by_transaction(organization_id, provider, &provider_transaction_id)
                    .await?
                    .and_then(|row| row.order_id),
            };

            if let Some(order_id) = found {
                return Ok(PaymentOwner::Order(order_id));
            }
        }

        Err(WebhookError::ReferenceNotFound(
            event.provider_reference.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryOrderRepository, InMemorySubscriptionRepository, InMemoryTransactionLedger,
    };
    use crate::domain::billing::{
        BillingCycle, FulfillmentStatus, Order, OrderPaymentStatus, PaymentStatus, Subscription,
        SubscriptionStatus,
    };
    use crate::domain::foundation::{OrderId, Timestamp};
    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    struct Fixture {
        resolver: ReferenceResolver,
        orders: InMemoryOrderRepository,
        subscriptions: InMemorySubscriptionRepository,
        ledger: InMemoryTransactionLedger,
        org: OrganizationId,
    }

    fn fixture() -> Fixture {
        let orders = InMemoryOrderRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let ledger = InMemoryTransactionLedger::new();
        let resolver = ReferenceResolver::new(
            Arc::new(orders.clone()),
            Arc::new(subscriptions.clone()),
            Arc::new(ledger.clone()),
        );
        Fixture {
            resolver,
            orders,
            subscriptions,
            ledger,
            org: OrganizationId::new(),
        }
    }

    fn subscription_with_id(org: OrganizationId, id: SubscriptionId) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            id,
            organization_id: org,
            status: SubscriptionStatus::Active,
            billing_cycle: BillingCycle::Monthly,
            current_period_start: now,
            current_period_end: now.add_months(1),
            updated_at: now,
        }
    }

    fn order(org: OrganizationId, reference: Option<&str>) -> Order {
        Order {
            id: OrderId::new(),
            organization_id: org,
            payment_status: OrderPaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            payment_reference: reference.map(str::to_string),
            updated_at: Timestamp::now(),
        }
    }

    fn event(reference: &str, tx: &str) -> PaymentEvent {
        PaymentEvent {
            provider: Provider::Wompi,
            provider_transaction_id: tx.to_string(),
            provider_reference: reference.to_string(),
            status: PaymentStatus::Approved,
            amount_minor_units: 1000,
            currency: "COP".to_string(),
            raw_payload: json!({}),
            occurred_at: Timestamp::now(),
        }
    }

    fn id_with_prefix(prefix: &str) -> SubscriptionId {
        let tail = Uuid::new_v4().simple().to_string();
        let text = format!("{}{}", prefix, &tail[8..]);
        SubscriptionId::from_uuid(Uuid::parse_str(&text).unwrap())
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription References
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn resolves_subscription_by_short_id() {
        let f = fixture();
        let id = id_with_prefix("12345678");
        f.subscriptions.insert(subscription_with_id(f.org, id)).await;

        let owner = f
            .resolver
            .resolve(&f.org, &event("SUB-12345678-1700000000-ab12", "tx_1"))
            .await
            .unwrap();

        assert_eq!(owner, PaymentOwner::Subscription(id));
    }

    #[tokio::test]
    async fn unknown_short_id_is_not_found() {
        let f = fixture();
        f.subscriptions
            .insert(subscription_with_id(f.org, id_with_prefix("aaaaaaaa")))
            .await;

        let err = f
            .resolver
            .resolve(&f.org, &event("SUB-12345678-1700000000-ab12", "tx_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ReferenceNotFound(_)));
    }

    #[tokio::test]
    async fn subscription_in_other_organization_is_not_found() {
        let f = fixture();
        f.subscriptions
            .insert(subscription_with_id(OrganizationId::new(), id_with_prefix("12345678")))
            .await;

        let err = f
            .resolver
            .resolve_subscription_id(&f.org, "SUB-12345678-1700000000-ab12")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ReferenceNotFound(_)));
    }

    #[tokio::test]
    async fn colliding_short_ids_are_ambiguous() {
        let f = fixture();
        f.subscriptions
            .insert(subscription_with_id(f.org, id_with_prefix("12345678")))
            .await;
        f.subscriptions
            .insert(subscription_with_id(f.org, id_with_prefix("12345678")))
            .await;

        let err = f
            .resolver
            .resolve_subscription_id(&f.org, "SUB-12345678-1700000000-ab12")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ReferenceAmbiguous(_)));
    }

    #[tokio::test]
    async fn malformed_subscription_reference_is_not_found() {
        let f = fixture();
        let err = f
            .resolver
            .resolve_subscription_id(&f.org, "SUB-xyz")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ReferenceNotFound(_)));
    }

    // ══════════════════════════════════════════════════════════════
    // Order References
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn resolves_order_by_stored_reference() {
        let f = fixture();
        let stored = order(f.org, Some("ORD-abc-1"));
        f.orders.insert(stored.clone()).await;

        let owner = f.resolver.resolve(&f.org, &event("ORD-abc-1", "tx_1")).await.unwrap();

        assert_eq!(owner, PaymentOwner::Order(stored.id));
    }

    #[tokio::test]
    async fn falls_back_to_ledger_link_for_same_transaction() {
        let f = fixture();
        let stored = order(f.org, None);
        f.orders.insert(stored.clone()).await;
        f.ledger
            .upsert(&f.org, &event("legacy-ref", "tx_1"), Some(PaymentOwner::Order(stored.id)))
            .await
            .unwrap();

        let owner = f.resolver.resolve(&f.org, &event("legacy-ref", "tx_1")).await.unwrap();

        assert_eq!(owner, PaymentOwner::Order(stored.id));
    }

    #[tokio::test]
    async fn unknown_order_reference_is_not_found() {
        let f = fixture();
        let err = f
            .resolver
            .resolve(&f.org, &event("ORD-missing", "tx_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ReferenceNotFound(_)));
    }

    #[test]
    fn order_lookups_try_reference_first() {
        let lookups = order_lookups("ORD-1", Provider::Epayco, "98765");
        assert_eq!(lookups[0], OrderLookup::ByReference("ORD-1".to_string()));
        assert!(matches!(lookups[1], OrderLookup::ByTransaction { .. }));
    }

    // ══════════════════════════════════════════════════════════════
    // Property Tests
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn reference_resolves_only_to_matching_subscription(
            short in "[0-9a-f]{8}",
            decoys in proptest::collection::vec("[0-9a-f]{8}", 0..5),
            millis in 1_000_000_000_000i64..2_000_000_000_000,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let f = fixture();
                let mut expected = None;
                for prefix in decoys.iter().filter(|d| **d != short) {
                    f.subscriptions.insert(subscription_with_id(f.org, id_with_prefix(prefix))).await;
                }
                if millis % 2 == 0 {
                    let id = id_with_prefix(&short);
                    f.subscriptions.insert(subscription_with_id(f.org, id)).await;
                    expected = Some(id);
                }

                let reference = format!("SUB-{}-{}-ab12", short, millis);
                let resolved = f.resolver.resolve_subscription_id(&f.org, &reference).await;

                match expected {
                    Some(id) => prop_assert_eq!(resolved.unwrap(), id),
                    None => prop_assert!(matches!(resolved, Err(WebhookError::ReferenceNotFound(_)))),
                }
                Ok(())
            })?;
        }
    }
}
