//! SubscriptionRepository port - payment-side access to subscriptions.

use async_trait::async_trait;

use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, OrganizationId, SubscriptionId, Timestamp};

/// New values written by a subscription transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All subscriptions in the organization whose id starts with `short_id`.
    ///
    /// Candidates only; the caller must exact-match each one.
    async fn find_by_short_id(
        &self,
        organization_id: &OrganizationId,
        short_id: &str,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Writes `next` only if status and `current_period_end` still equal
    /// those of `current`. Checking the period end as well keeps two
    /// concurrent renewals from both extending an active subscription.
    async fn compare_and_set(
        &self,
        current: &Subscription,
        next: &SubscriptionUpdate,
    ) -> Result<bool, DomainError>;
}
