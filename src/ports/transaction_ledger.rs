//! TransactionLedger port - idempotency-keyed record of provider transactions.
//!
//! The ledger is keyed by `(provider, provider_transaction_id)`. Every
//! delivery of the same transaction lands on the same row, no matter how
//! many times or how concurrently the provider sends it.
//!
//! Implementations must make `upsert` and `claim_transition` single atomic
//! operations. A read followed by a separate insert or update is a race
//! between concurrent deliveries.

use async_trait::async_trait;

use crate::domain::billing::{PaymentEvent, PaymentOwner, PaymentStatus, Provider, TransactionLedgerRow};
use crate::domain::foundation::{DomainError, LedgerRowId, OrganizationId};

/// What an upsert did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// First sighting of this transaction.
    Inserted,
    /// Existing row moved to a new status.
    StatusChanged,
    /// Duplicate delivery, or a status the row may not move to.
    Unchanged,
}

/// Result of [`TransactionLedger::upsert`].
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub row: TransactionLedgerRow,
    pub change: LedgerChange,
}

#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Inserts or updates the row for `event`.
    ///
    /// On conflict the row is updated only when its current status is
    /// superseded by the incoming one (see `PaymentStatus::superseded_by`).
    /// `completed_at` is stamped once, on the first `Approved`. A missing
    /// owner link is filled in when `owner` is given; an existing link is
    /// never replaced.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the transaction already belongs to another organization
    /// - `DatabaseError` on persistence failure
    async fn upsert(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
        owner: Option<PaymentOwner>,
    ) -> Result<UpsertOutcome, DomainError>;

    /// Finds a row by its idempotency key, scoped to the organization.
    async fn find_by_transaction(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionLedgerRow>, DomainError>;

    /// Links a row that has no owner yet. A row that already has an owner
    /// keeps it; returns the row as stored afterwards.
    async fn link_owner(
        &self,
        row_id: &LedgerRowId,
        owner: PaymentOwner,
    ) -> Result<TransactionLedgerRow, DomainError>;

    /// Claims the right to apply the order/subscription effect of `status`.
    ///
    /// Succeeds for exactly one caller per `(row, status)`, and only while
    /// the row is still in `status`.
    async fn claim_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
    ) -> Result<bool, DomainError>;

    /// Returns a claim after the effect could not be applied, so a
    /// redelivery can claim it again.
    async fn release_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
        previous: Option<PaymentStatus>,
    ) -> Result<(), DomainError>;
}
