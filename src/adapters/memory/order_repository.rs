//! In-memory order repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Order, OrderPaymentStatus};
use crate::domain::foundation::{DomainError, OrderId, OrganizationId, Timestamp};
use crate::ports::OrderRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order, as the storefront would when it is placed.
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    pub async fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.read().await.get(id).cloned()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &OrderId,
    ) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(id)
            .filter(|order| order.organization_id == *organization_id)
            .cloned())
    }

    async fn find_by_payment_reference(
        &self,
        organization_id: &OrganizationId,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| {
                order.organization_id == *organization_id
                    && order.payment_reference.as_deref() == Some(reference)
            })
            .cloned())
    }

    async fn compare_and_set_payment_status(
        &self,
        current: &Order,
        next: OrderPaymentStatus,
    ) -> Result<bool, DomainError> {
        let mut orders = self.orders.write().await;
        let Some(stored) = orders.get_mut(&current.id) else {
            return Ok(false);
        };
        if stored.organization_id != current.organization_id
            || stored.payment_status != current.payment_status
        {
            return Ok(false);
        }

        stored.payment_status = next;
        if next == OrderPaymentStatus::Paid {
            stored.fulfillment_status = stored.fulfillment_status.confirmed_by_payment();
        }
        stored.updated_at = Timestamp::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::FulfillmentStatus;

    fn order(org: OrganizationId, reference: &str) -> Order {
        Order {
            id: OrderId::new(),
            organization_id: org,
            payment_status: OrderPaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            payment_reference: Some(reference.to_string()),
            updated_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn finds_by_reference_within_organization_only() {
        let repo = InMemoryOrderRepository::new();
        let org = OrganizationId::new();
        repo.insert(order(org, "ORD-1")).await;

        assert!(repo.find_by_payment_reference(&org, "ORD-1").await.unwrap().is_some());
        assert!(repo
            .find_by_payment_reference(&OrganizationId::new(), "ORD-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn paid_confirms_pending_fulfillment() {
        let repo = InMemoryOrderRepository::new();
        let current = order(OrganizationId::new(), "ORD-1");
        repo.insert(current.clone()).await;

        assert!(repo
            .compare_and_set_payment_status(&current, OrderPaymentStatus::Paid)
            .await
            .unwrap());

        let stored = repo.get(&current.id).await.unwrap();
        assert_eq!(stored.payment_status, OrderPaymentStatus::Paid);
        assert_eq!(stored.fulfillment_status, FulfillmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn stale_expected_status_misses() {
        let repo = InMemoryOrderRepository::new();
        let current = order(OrganizationId::new(), "ORD-1");
        repo.insert(current.clone()).await;
        repo.compare_and_set_payment_status(&current, OrderPaymentStatus::Failed)
            .await
            .unwrap();

        let applied = repo
            .compare_and_set_payment_status(&current, OrderPaymentStatus::Paid)
            .await
            .unwrap();

        assert!(!applied);
        assert_eq!(repo.get(&current.id).await.unwrap().payment_status, OrderPaymentStatus::Failed);
    }
}
