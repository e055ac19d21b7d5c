//! In-memory subscription repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, OrganizationId, SubscriptionId, Timestamp};
use crate::ports::{SubscriptionRepository, SubscriptionUpdate};

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription);
    }

    pub async fn get(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.subscriptions.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .get(id)
            .filter(|s| s.organization_id == *organization_id)
            .cloned())
    }

    async fn find_by_short_id(
        &self,
        organization_id: &OrganizationId,
        short_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        let short_id = short_id.to_ascii_lowercase();
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .filter(|s| s.organization_id == *organization_id && s.id.to_string().starts_with(&short_id))
            .cloned()
            .collect())
    }

    async fn compare_and_set(
        &self,
        current: &Subscription,
        next: &SubscriptionUpdate,
    ) -> Result<bool, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let Some(stored) = subscriptions.get_mut(&current.id) else {
            return Ok(false);
        };
        if stored.organization_id != current.organization_id
            || stored.status != current.status
            || stored.current_period_end != current.current_period_end
        {
            return Ok(false);
        }

        stored.status = next.status;
        stored.current_period_start = next.current_period_start;
        stored.current_period_end = next.current_period_end;
        stored.updated_at = Timestamp::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BillingCycle, SubscriptionStatus};

    fn subscription(org: OrganizationId) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            id: SubscriptionId::new(),
            organization_id: org,
            status: SubscriptionStatus::Active,
            billing_cycle: BillingCycle::Monthly,
            current_period_start: now,
            current_period_end: now.add_months(1),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn short_id_lookup_is_scoped() {
        let repo = InMemorySubscriptionRepository::new();
        let org = OrganizationId::new();
        let sub = subscription(org);
        repo.insert(sub.clone()).await;

        let found = repo.find_by_short_id(&org, &sub.id.short_id()).await.unwrap();
        assert_eq!(found.len(), 1);

        let other = repo
            .find_by_short_id(&OrganizationId::new(), &sub.id.short_id())
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn compare_and_set_checks_period_end() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription(OrganizationId::new());
        repo.insert(sub.clone()).await;

        let renewed = SubscriptionUpdate {
            status: SubscriptionStatus::Active,
            current_period_start: sub.current_period_end,
            current_period_end: sub.current_period_end.add_months(1),
        };
        assert!(repo.compare_and_set(&sub, &renewed).await.unwrap());
        // Same snapshot again: the period end moved, so the second renewal misses.
        assert!(!repo.compare_and_set(&sub, &renewed).await.unwrap());
    }
}
