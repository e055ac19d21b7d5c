//! OrderRepository port - payment-side access to store orders.
//!
//! Orders are created and owned elsewhere. This port reads them and moves
//! their payment status with compare-and-swap updates only.

use async_trait::async_trait;

use crate::domain::billing::{Order, OrderPaymentStatus};
use crate::domain::foundation::{DomainError, OrderId, OrganizationId};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &OrderId,
    ) -> Result<Option<Order>, DomainError>;

    /// Finds the order whose stored payment reference equals `reference`.
    async fn find_by_payment_reference(
        &self,
        organization_id: &OrganizationId,
        reference: &str,
    ) -> Result<Option<Order>, DomainError>;

    /// Sets `payment_status` to `next` only if it still equals
    /// `current.payment_status`.
    ///
    /// When `next` is `Paid`, a `Pending` fulfillment status becomes
    /// `Confirmed` in the same update. Returns false when another writer
    /// got there first.
    async fn compare_and_set_payment_status(
        &self,
        current: &Order,
        next: OrderPaymentStatus,
    ) -> Result<bool, DomainError>;
}
