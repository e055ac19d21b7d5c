//! payment-webhooks server binary.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use payment_webhooks::adapters::http::{webhook_router, WebhookAppState, WebhookSettings};
use payment_webhooks::adapters::memory::{
    InMemoryMessagingEventSink, InMemoryOrderRepository, InMemoryOrganizationDirectory,
    InMemoryProviderConfigStore, InMemorySubscriptionRepository, InMemoryTransactionLedger,
    InMemoryWebhookLogRepository,
};
use payment_webhooks::adapters::postgres::{
    PostgresMessagingEventSink, PostgresOrderRepository, PostgresOrganizationDirectory,
    PostgresProviderConfigStore, PostgresSubscriptionRepository, PostgresTransactionLedger,
    PostgresWebhookLogRepository,
};
use payment_webhooks::adapters::CachedProviderConfigStore;
use payment_webhooks::application::AuditLogger;
use payment_webhooks::config::{AppConfig, DatabaseConfig, LogFormat, ServerConfig};
use payment_webhooks::domain::foundation::Timestamp;
use payment_webhooks::ports::ProviderConfigStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let settings = WebhookSettings {
        messaging_secret: config.webhooks.messaging_secret.clone(),
        max_transition_attempts: config.webhooks.max_transition_attempts,
        redacted_headers: config.webhooks.redacted_headers(),
    };

    let mut state = if config.database.is_configured() {
        postgres_state(&config.database, settings).await?
    } else {
        tracing::warn!("No database configured, using in-memory storage");
        memory_state(settings)
    };

    // Credentials change rarely and are read on every delivery.
    let cached: Arc<dyn ProviderConfigStore> = Arc::new(CachedProviderConfigStore::with_ttl(
        state.provider_configs.clone(),
        config.webhooks.provider_config_ttl(),
    ));
    state.provider_configs = cached;

    if let Some(days) = config.webhooks.audit_retention_days {
        tokio::spawn(prune_audit_log(state.audit_logger(), days));
    }

    let app = webhook_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn postgres_state(
    database: &DatabaseConfig,
    settings: WebhookSettings,
) -> Result<WebhookAppState, BoxError> {
    tracing::info!(
        max_connections = database.max_connections,
        min_connections = database.min_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(WebhookAppState {
        ledger: Arc::new(PostgresTransactionLedger::new(pool.clone())),
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        provider_configs: Arc::new(PostgresProviderConfigStore::new(pool.clone())),
        organizations: Arc::new(PostgresOrganizationDirectory::new(pool.clone())),
        webhook_logs: Arc::new(PostgresWebhookLogRepository::new(pool.clone())),
        messaging_sink: Arc::new(PostgresMessagingEventSink::new(pool)),
        settings,
    })
}

fn memory_state(settings: WebhookSettings) -> WebhookAppState {
    WebhookAppState {
        ledger: Arc::new(InMemoryTransactionLedger::new()),
        orders: Arc::new(InMemoryOrderRepository::new()),
        subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
        provider_configs: Arc::new(InMemoryProviderConfigStore::new()),
        organizations: Arc::new(InMemoryOrganizationDirectory::new()),
        webhook_logs: Arc::new(InMemoryWebhookLogRepository::new()),
        messaging_sink: Arc::new(InMemoryMessagingEventSink::new()),
        settings,
    }
}

async fn prune_audit_log(audit: AuditLogger, retention_days: u32) {
    let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
    loop {
        interval.tick().await;
        audit.prune(Timestamp::now(), retention_days).await;
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
