//! End-to-end webhook flows through the HTTP router on in-memory adapters.
//!
//! These tests drive the full stack:
//! 1. Route matching and extraction
//! 2. Signature verification and normalization
//! 3. Reconciliation into orders and subscriptions
//! 4. The audit trail

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use payment_webhooks::adapters::http::{webhook_router, WebhookAppState, WebhookSettings};
use payment_webhooks::adapters::memory::{
    InMemoryMessagingEventSink, InMemoryOrderRepository, InMemoryOrganizationDirectory,
    InMemoryProviderConfigStore, InMemorySubscriptionRepository, InMemoryTransactionLedger,
    InMemoryWebhookLogRepository,
};
use payment_webhooks::domain::billing::{
    BillingCycle, FulfillmentStatus, Order, OrderPaymentStatus, PaymentStatus, Provider,
    Subscription, SubscriptionReference, SubscriptionStatus,
};
use payment_webhooks::domain::foundation::{OrderId, OrganizationId, SubscriptionId, Timestamp};
use payment_webhooks::domain::webhook::verifier::{epayco_signature, wompi_checksum};
use payment_webhooks::domain::webhook::ProviderCredentials;
use payment_webhooks::ports::WebhookOutcome;

const WOMPI_SECRET: &str = "test_events_secret";
const EPAYCO_CUSTOMER: &str = "12345";
const EPAYCO_KEY: &str = "p_key_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    ledger: InMemoryTransactionLedger,
    orders: InMemoryOrderRepository,
    subscriptions: InMemorySubscriptionRepository,
    logs: InMemoryWebhookLogRepository,
    sink: InMemoryMessagingEventSink,
    org: OrganizationId,
}

async fn test_app() -> TestApp {
    let org = OrganizationId::new();

    let organizations = InMemoryOrganizationDirectory::new();
    organizations.insert("acme", org).await;
    organizations.insert_messaging_instance("acme-main", org).await;

    let configs = InMemoryProviderConfigStore::new();
    configs
        .insert(
            org,
            Provider::Wompi,
            ProviderCredentials::new("pub_test", "prv_test").with_integrity_secret(WOMPI_SECRET),
        )
        .await;
    configs
        .insert(
            org,
            Provider::Epayco,
            ProviderCredentials::new(EPAYCO_CUSTOMER, "private").with_integrity_secret(EPAYCO_KEY),
        )
        .await;

    let ledger = InMemoryTransactionLedger::new();
    let orders = InMemoryOrderRepository::new();
    let subscriptions = InMemorySubscriptionRepository::new();
    let logs = InMemoryWebhookLogRepository::new();
    let sink = InMemoryMessagingEventSink::new();

    let state = WebhookAppState {
        ledger: Arc::new(ledger.clone()),
        orders: Arc::new(orders.clone()),
        subscriptions: Arc::new(subscriptions.clone()),
        provider_configs: Arc::new(configs),
        organizations: Arc::new(organizations),
        webhook_logs: Arc::new(logs.clone()),
        messaging_sink: Arc::new(sink.clone()),
        settings: WebhookSettings::default(),
    };

    TestApp {
        router: webhook_router().with_state(state),
        ledger,
        orders,
        subscriptions,
        logs,
        sink,
        org,
    }
}

impl TestApp {
    async fn post(&self, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn insert_order(&self, reference: &str) -> Order {
        let order = Order {
            id: OrderId::new(),
            organization_id: self.org,
            payment_status: OrderPaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            payment_reference: Some(reference.to_string()),
            updated_at: Timestamp::now(),
        };
        self.orders.insert(order.clone()).await;
        order
    }

    async fn insert_subscription(&self, status: SubscriptionStatus, period_end: Timestamp) -> Subscription {
        let subscription = Subscription {
            id: SubscriptionId::new(),
            organization_id: self.org,
            status,
            billing_cycle: BillingCycle::Monthly,
            current_period_start: period_end.add_days(-30),
            current_period_end: period_end,
            updated_at: Timestamp::now(),
        };
        self.subscriptions.insert(subscription.clone()).await;
        subscription
    }
}

fn wompi_body(tx: &str, reference: &str, status: &str, secret: &str) -> Vec<u8> {
    let data = json!({"transaction": {
        "id": tx, "reference": reference, "status": status,
        "amount_in_cents": 5000000, "currency": "COP"
    }});
    let properties = ["transaction.id", "transaction.status", "transaction.amount_in_cents"];
    let checksum = wompi_checksum(&data, &properties, "1700000000", secret);
    serde_json::to_vec(&json!({
        "event": "transaction.updated",
        "data": data,
        "signature": {"checksum": checksum, "properties": properties},
        "timestamp": 1700000000
    }))
    .unwrap()
}

fn epayco_body(ref_payco: &str, invoice: &str, code: &str, key: &str) -> Vec<u8> {
    let signature = epayco_signature(EPAYCO_CUSTOMER, key, ref_payco, "tx-9", "50000.00", "COP");
    serde_json::to_vec(&json!({
        "x_ref_payco": ref_payco,
        "x_id_invoice": invoice,
        "x_transaction_id": "tx-9",
        "x_amount": "50000.00",
        "x_currency_code": "COP",
        "x_cod_response": code,
        "x_signature": signature
    }))
    .unwrap()
}

// =============================================================================
// Payment Webhooks
// =============================================================================

#[tokio::test]
async fn approved_wompi_payment_marks_order_paid() {
    let app = test_app().await;
    let order = app.insert_order("ORD-1001").await;

    let (status, body) = app
        .post(
            "/webhooks/payments/wompi?org=acme",
            wompi_body("tx_1", "ORD-1001", "APPROVED", WOMPI_SECRET),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));

    let order = app.orders.get(&order.id).await.unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Confirmed);

    let rows = app.ledger.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, PaymentStatus::Approved);
    assert!(rows[0].completed_at.is_some());
}

#[tokio::test]
async fn subscription_renewal_extends_period_from_current_end() {
    let app = test_app().await;
    let period_end = Timestamp::now().add_days(10);
    let subscription = app
        .insert_subscription(SubscriptionStatus::PastDue, period_end)
        .await;
    let reference = SubscriptionReference::generate(&subscription.id, Timestamp::now()).to_string();

    let (status, _) = app
        .post(
            "/webhooks/payments/wompi?org=acme",
            wompi_body("tx_sub", &reference, "APPROVED", WOMPI_SECRET),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let renewed = app.subscriptions.get(&subscription.id).await.unwrap();
    assert_eq!(renewed.status, SubscriptionStatus::Active);
    assert_eq!(renewed.current_period_start, period_end);
    assert_eq!(renewed.current_period_end, period_end.add_months(1));
}

#[tokio::test]
async fn wrong_secret_is_rejected_without_touching_the_ledger() {
    let app = test_app().await;
    let order = app.insert_order("ORD-1002").await;

    let (status, body) = app
        .post(
            "/webhooks/payments/wompi?org=acme",
            wompi_body("tx_2", "ORD-1002", "APPROVED", "not_the_secret"),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid signature"}));
    assert!(app.ledger.rows().await.is_empty());
    assert_eq!(
        app.orders.get(&order.id).await.unwrap().payment_status,
        OrderPaymentStatus::Pending
    );

    let logs = app.logs.records().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, WebhookOutcome::Error);
    assert_eq!(logs[0].response_status, 401);
}

#[tokio::test]
async fn redelivery_is_acknowledged_and_applied_once() {
    let app = test_app().await;
    let subscription = app
        .insert_subscription(SubscriptionStatus::Active, Timestamp::now().add_days(3))
        .await;
    let reference = SubscriptionReference::generate(&subscription.id, Timestamp::now()).to_string();
    let body = wompi_body("tx_3", &reference, "APPROVED", WOMPI_SECRET);

    for _ in 0..3 {
        let (status, _) = app.post("/webhooks/payments/wompi?org=acme", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let renewed = app.subscriptions.get(&subscription.id).await.unwrap();
    assert_eq!(
        renewed.current_period_end,
        subscription.current_period_end.add_months(1)
    );
    assert_eq!(app.ledger.rows().await.len(), 1);
    assert_eq!(app.logs.records().await.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_extend_the_period_once() {
    let app = Arc::new(test_app().await);
    let subscription = app
        .insert_subscription(SubscriptionStatus::Active, Timestamp::now().add_days(3))
        .await;
    let reference = SubscriptionReference::generate(&subscription.id, Timestamp::now()).to_string();
    let body = wompi_body("tx_4", &reference, "APPROVED", WOMPI_SECRET);

    let deliveries: Vec<_> = (0..4)
        .map(|_| {
            let app = Arc::clone(&app);
            let body = body.clone();
            tokio::spawn(async move { app.post("/webhooks/payments/wompi?org=acme", body).await })
        })
        .collect();

    for delivery in deliveries {
        let (status, _) = delivery.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let renewed = app.subscriptions.get(&subscription.id).await.unwrap();
    assert_eq!(
        renewed.current_period_end,
        subscription.current_period_end.add_months(1)
    );
    assert_eq!(app.ledger.rows().await.len(), 1);
    assert_eq!(app.logs.records().await.len(), 4);
}

#[tokio::test]
async fn approved_epayco_confirmation_marks_order_paid() {
    let app = test_app().await;
    let order = app.insert_order("ORD-2001").await;

    let (status, _) = app
        .post(
            "/webhooks/payments/epayco?org=acme",
            epayco_body("9001", "ORD-2001", "1", EPAYCO_KEY),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.orders.get(&order.id).await.unwrap().payment_status,
        OrderPaymentStatus::Paid
    );
    let rows = app.ledger.rows().await;
    assert_eq!(rows[0].provider, Provider::Epayco);
    assert_eq!(rows[0].amount_minor_units, 5_000_000);
}

#[tokio::test]
async fn tampered_epayco_confirmation_is_rejected() {
    let app = test_app().await;
    app.insert_order("ORD-2002").await;

    let (status, _) = app
        .post(
            "/webhooks/payments/epayco?org=acme",
            epayco_body("9002", "ORD-2002", "1", "guessed_key"),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.ledger.rows().await.is_empty());
}

#[tokio::test]
async fn provider_without_credentials_fails_closed() {
    let app = test_app().await;

    let (status, _) = app
        .post("/webhooks/payments/meta_cloud?org=acme", b"{}".to_vec())
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_org_parameter_is_rejected() {
    let app = test_app().await;

    let (status, _) = app
        .post(
            "/webhooks/payments/wompi",
            wompi_body("tx_5", "ORD-1", "APPROVED", WOMPI_SECRET),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_reference_is_recorded_unlinked() {
    let app = test_app().await;

    let (status, _) = app
        .post(
            "/webhooks/payments/wompi?org=acme",
            wompi_body("tx_6", "ORD-NOPE", "APPROVED", WOMPI_SECRET),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let rows = app.ledger.rows().await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].order_id.is_none());
    assert!(rows[0].subscription_id.is_none());
}

// =============================================================================
// Messaging Webhooks
// =============================================================================

#[tokio::test]
async fn messaging_event_without_secret_is_accepted() {
    let app = test_app().await;
    let body = serde_json::to_vec(&json!({
        "event": "messages.upsert",
        "instance": "acme-main",
        "data": {"key": {"remoteJid": "573001234567@s.whatsapp.net"}}
    }))
    .unwrap();

    let (status, response) = app.post("/webhooks/whatsapp", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"received": true}));
    let events = app.sink.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, app.org);
}
