//! HTTP API server for the order lifecycle service.
//!
//! Exposes order placement and queries, accepts payment and shipment
//! outcomes, and wires the configured store and transport together, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod consumer;
pub mod error;
pub mod routes;
pub mod simulation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use emitter::{
    BusTransport, EventEmitter, HttpEndpoints, HttpTransport, LogTransport, QueueTransport,
    TransportKind,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore, StoreError};
use saga::{CoordinatorOptions, OrderCoordinator};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, StoreBackend};
use consumer::{InboundConsumer, RedeliveryPolicy};
use error::StartupError;
use simulation::{OutboundFeed, SimulatedServices};

/// Buffer size of the in-process channels.
const CHANNEL_CAPACITY: usize = 1024;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: OrderCoordinator,
    pub consumer: InboundConsumer,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::add))
        .route("/orders", get(routes::orders::list))
        .route("/orders/add/{userid}", post(routes::orders::add_for_user))
        .route("/orders/user/{userid}", get(routes::orders::list_for_user))
        .route("/orders/{id}", get(routes::orders::get))
        .route(
            "/orders/{id}/payment/retry",
            post(routes::orders::retry_payment),
        )
        .route("/events", post(routes::events::ingest))
        .route("/events/payment", post(routes::events::payment))
        .route("/events/shipment", post(routes::events::shipment))
        .route("/events/dead-letters", get(routes::events::dead_letters))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over an existing store and emitter with
/// default timeouts and redelivery.
pub fn create_state(store: Arc<dyn OrderStore>, emitter: Arc<dyn EventEmitter>) -> Arc<AppState> {
    let coordinator = OrderCoordinator::new(store, emitter);
    let consumer = InboundConsumer::new(coordinator.clone(), RedeliveryPolicy::default());
    Arc::new(AppState {
        coordinator,
        consumer,
    })
}

/// Opens the configured order store, running migrations for PostgreSQL.
pub async fn build_store(config: &Config) -> Result<Arc<dyn OrderStore>, StartupError> {
    match config.order_store {
        StoreBackend::Memory => {
            tracing::info!(lookup = %config.user_lookup, "using in-memory order store");
            Ok(Arc::new(InMemoryOrderStore::with_lookup(config.user_lookup)))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(config.store_timeout)
                .connect(url)
                .await?;

            let store = PostgresOrderStore::new(pool).with_lookup(config.user_lookup);
            store.run_migrations().await.map_err(StoreError::from)?;
            tracing::info!(lookup = %config.user_lookup, "using PostgreSQL order store");
            Ok(Arc::new(store))
        }
    }
}

/// Builds the application state from configuration.
///
/// Also returns the background tasks started for the in-process transports
/// so the caller can stop them on shutdown.
pub async fn build_state(
    config: &Config,
) -> Result<(Arc<AppState>, Vec<JoinHandle<()>>), StartupError> {
    let store = build_store(config).await?;

    let (emitter, feed): (Arc<dyn EventEmitter>, Option<OutboundFeed>) = match config.transport {
        TransportKind::Log => (Arc::new(LogTransport::new()), None),
        TransportKind::Queue => {
            let (queue, rx) = QueueTransport::channel(CHANNEL_CAPACITY);
            (Arc::new(queue), Some(OutboundFeed::Queue(rx)))
        }
        TransportKind::Bus => {
            let bus = BusTransport::new(CHANNEL_CAPACITY);
            let feed = config
                .simulate_services
                .then(|| OutboundFeed::Bus(bus.subscribe()));
            (Arc::new(bus), feed)
        }
        TransportKind::Http => {
            let endpoints = HttpEndpoints {
                payment_url: config.payment_url.clone(),
                shipment_url: config.shipment_url.clone(),
            };
            (
                Arc::new(HttpTransport::new(endpoints, config.emit_timeout)?),
                None,
            )
        }
    };
    tracing::info!(transport = %config.transport, "event transport ready");

    let options = CoordinatorOptions {
        store_timeout: config.store_timeout,
        emit_timeout: config.emit_timeout,
        max_update_attempts: config.update_max_attempts,
    };
    let coordinator = OrderCoordinator::with_options(store, emitter, options);
    let consumer = InboundConsumer::new(coordinator.clone(), config.redelivery.clone())
        .with_dead_letter_capacity(config.dead_letter_capacity);

    let mut tasks = Vec::new();
    if let Some(feed) = feed.filter(|_| config.simulate_services) {
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        tasks.push(consumer.clone().spawn(inbound_rx));
        tasks.push(SimulatedServices::default().spawn(feed, inbound_tx));
        tracing::info!("simulated payment and shipment services started");
    }

    let state = Arc::new(AppState {
        coordinator,
        consumer,
    });
    Ok((state, tasks))
}
