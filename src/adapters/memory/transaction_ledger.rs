//! In-memory transaction ledger.
//!
//! One write lock covers the whole upsert, which gives the same atomicity
//! the Postgres adapter gets from `INSERT ... ON CONFLICT`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{PaymentEvent, PaymentOwner, PaymentStatus, Provider, TransactionLedgerRow};
use crate::domain::foundation::{DomainError, ErrorCode, LedgerRowId, OrganizationId, Timestamp};
use crate::ports::{LedgerChange, TransactionLedger, UpsertOutcome};

type LedgerKey = (Provider, String);

#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionLedger {
    rows: Arc<RwLock<HashMap<LedgerKey, TransactionLedgerRow>>>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, for assertions.
    pub async fn rows(&self) -> Vec<TransactionLedgerRow> {
        self.rows.read().await.values().cloned().collect()
    }
}

fn new_row(organization_id: &OrganizationId, event: &PaymentEvent, owner: Option<PaymentOwner>) -> TransactionLedgerRow {
    let now = Timestamp::now();
    TransactionLedgerRow {
        id: LedgerRowId::new(),
        organization_id: *organization_id,
        provider: event.provider,
        provider_transaction_id: event.provider_transaction_id.clone(),
        provider_reference: event.provider_reference.clone(),
        order_id: owner.and_then(|o| o.order_id()),
        subscription_id: owner.and_then(|o| o.subscription_id()),
        status: event.status,
        amount_minor_units: event.amount_minor_units,
        currency: event.currency.clone(),
        raw_response: event.raw_payload.clone(),
        applied_status: None,
        completed_at: event.status.is_success().then_some(now),
        created_at: now,
        updated_at: now,
    }
}

fn is_unlinked(row: &TransactionLedgerRow) -> bool {
    row.order_id.is_none() && row.subscription_id.is_none()
}

fn set_owner(row: &mut TransactionLedgerRow, owner: PaymentOwner) {
    row.order_id = owner.order_id();
    row.subscription_id = owner.subscription_id();
}

#[async_trait]
impl TransactionLedger for InMemoryTransactionLedger {
    async fn upsert(
        &self,
        organization_id: &OrganizationId,
        event: &PaymentEvent,
        owner: Option<PaymentOwner>,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut rows = self.rows.write().await;
        let key = (event.provider, event.provider_transaction_id.clone());

        let Some(row) = rows.get_mut(&key) else {
            let row = new_row(organization_id, event, owner);
            rows.insert(key, row.clone());
            return Ok(UpsertOutcome {
                row,
                change: LedgerChange::Inserted,
            });
        };

        if row.organization_id != *organization_id {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "transaction belongs to another organization",
            ));
        }

        if !row.status.superseded_by(event.status) {
            return Ok(UpsertOutcome {
                row: row.clone(),
                change: LedgerChange::Unchanged,
            });
        }

        let now = Timestamp::now();
        row.status = event.status;
        row.raw_response = event.raw_payload.clone();
        row.amount_minor_units = event.amount_minor_units;
        row.currency = event.currency.clone();
        row.updated_at = now;
        if event.status.is_success() && row.completed_at.is_none() {
            row.completed_at = Some(now);
        }
        if let (true, Some(owner)) = (is_unlinked(row), owner) {
            set_owner(row, owner);
        }

        Ok(UpsertOutcome {
            row: row.clone(),
            change: LedgerChange::StatusChanged,
        })
    }

    async fn find_by_transaction(
        &self,
        organization_id: &OrganizationId,
        provider: Provider,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionLedgerRow>, DomainError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(provider, provider_transaction_id.to_string()))
            .filter(|row| row.organization_id == *organization_id)
            .cloned())
    }

    async fn link_owner(
        &self,
        row_id: &LedgerRowId,
        owner: PaymentOwner,
    ) -> Result<TransactionLedgerRow, DomainError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .values_mut()
            .find(|row| row.id == *row_id)
            .ok_or_else(|| DomainError::new(ErrorCode::LedgerRowNotFound, row_id.to_string()))?;

        if is_unlinked(row) {
            set_owner(row, owner);
            row.updated_at = Timestamp::now();
        }
        Ok(row.clone())
    }

    async fn claim_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.values_mut().find(|row| row.id == *row_id) else {
            return Ok(false);
        };

        if row.status != status || row.applied_status == Some(status) {
            return Ok(false);
        }
        row.applied_status = Some(status);
        Ok(true)
    }

    async fn release_transition(
        &self,
        row_id: &LedgerRowId,
        status: PaymentStatus,
        previous: Option<PaymentStatus>,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows
            .values_mut()
            .find(|row| row.id == *row_id && row.applied_status == Some(status))
        {
            row.applied_status = previous;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(tx: &str, status: PaymentStatus) -> PaymentEvent {
        PaymentEvent {
            provider: Provider::Wompi,
            provider_transaction_id: tx.to_string(),
            provider_reference: "ORD-1".to_string(),
            status,
            amount_minor_units: 1000,
            currency: "COP".to_string(),
            raw_payload: json!({"status": status.as_str()}),
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn first_sighting_inserts() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();

        let outcome = ledger.upsert(&org, &event("tx_1", PaymentStatus::Pending), None).await.unwrap();

        assert_eq!(outcome.change, LedgerChange::Inserted);
        assert_eq!(ledger.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_is_unchanged() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();
        let approved = event("tx_1", PaymentStatus::Approved);

        ledger.upsert(&org, &approved, None).await.unwrap();
        let outcome = ledger.upsert(&org, &approved, None).await.unwrap();

        assert_eq!(outcome.change, LedgerChange::Unchanged);
        assert_eq!(ledger.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn pending_then_approved_changes_status_and_completes() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();

        ledger.upsert(&org, &event("tx_1", PaymentStatus::Pending), None).await.unwrap();
        let outcome = ledger.upsert(&org, &event("tx_1", PaymentStatus::Approved), None).await.unwrap();

        assert_eq!(outcome.change, LedgerChange::StatusChanged);
        assert_eq!(outcome.row.status, PaymentStatus::Approved);
        assert!(outcome.row.completed_at.is_some());
    }

    #[tokio::test]
    async fn late_pending_does_not_regress_approved_row() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();

        let first = ledger.upsert(&org, &event("tx_1", PaymentStatus::Approved), None).await.unwrap();
        let outcome = ledger.upsert(&org, &event("tx_1", PaymentStatus::Pending), None).await.unwrap();

        assert_eq!(outcome.change, LedgerChange::Unchanged);
        assert_eq!(outcome.row.status, PaymentStatus::Approved);
        assert_eq!(outcome.row.completed_at, first.row.completed_at);
    }

    #[tokio::test]
    async fn other_organization_cannot_touch_row() {
        let ledger = InMemoryTransactionLedger::new();
        ledger.upsert(&OrganizationId::new(), &event("tx_1", PaymentStatus::Pending), None).await.unwrap();

        let err = ledger
            .upsert(&OrganizationId::new(), &event("tx_1", PaymentStatus::Approved), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn find_is_scoped_to_organization() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();
        ledger.upsert(&org, &event("tx_1", PaymentStatus::Pending), None).await.unwrap();

        assert!(ledger.find_by_transaction(&org, Provider::Wompi, "tx_1").await.unwrap().is_some());
        assert!(ledger
            .find_by_transaction(&OrganizationId::new(), Provider::Wompi, "tx_1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn link_owner_keeps_existing_link() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();
        let first = crate::domain::foundation::OrderId::new();
        let outcome = ledger
            .upsert(&org, &event("tx_1", PaymentStatus::Pending), Some(PaymentOwner::Order(first)))
            .await
            .unwrap();

        let row = ledger
            .link_owner(&outcome.row.id, PaymentOwner::Order(crate::domain::foundation::OrderId::new()))
            .await
            .unwrap();
        assert_eq!(row.order_id, Some(first));
    }

    #[tokio::test]
    async fn claim_succeeds_once_per_status() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();
        let outcome = ledger.upsert(&org, &event("tx_1", PaymentStatus::Approved), None).await.unwrap();
        let id = outcome.row.id;

        assert!(ledger.claim_transition(&id, PaymentStatus::Approved).await.unwrap());
        assert!(!ledger.claim_transition(&id, PaymentStatus::Approved).await.unwrap());
        assert!(!ledger.claim_transition(&id, PaymentStatus::Voided).await.unwrap());
    }

    #[tokio::test]
    async fn released_claim_can_be_taken_again() {
        let ledger = InMemoryTransactionLedger::new();
        let org = OrganizationId::new();
        let outcome = ledger.upsert(&org, &event("tx_1", PaymentStatus::Declined), None).await.unwrap();
        let id = outcome.row.id;

        assert!(ledger.claim_transition(&id, PaymentStatus::Declined).await.unwrap());
        ledger.release_transition(&id, PaymentStatus::Declined, None).await.unwrap();
        assert!(ledger.claim_transition(&id, PaymentStatus::Declined).await.unwrap());
    }
}
