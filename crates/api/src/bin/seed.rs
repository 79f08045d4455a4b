//! Loads orders from a JSON file into the configured order store.
//!
//! Usage: `seed [path]` (default `data.json`). Each entry is an order
//! document with an optional `status`; entries without one are recorded as
//! `PendingPayment`. Entries that fail to decode or store are logged and
//! skipped.

use domain::{Order, OrderStatus};
use order_store::OrderStore;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

#[derive(Deserialize)]
struct SeedOrder {
    #[serde(flatten)]
    order: Order,
    #[serde(default)]
    status: Option<String>,
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "data.json".to_string());
    let data = std::fs::read(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(&data).unwrap_or_else(|e| panic!("{path} is not a JSON array: {e}"));

    let store = api::build_store(&config)
        .await
        .expect("failed to open order store");

    let total = entries.len();
    let mut seeded = 0;
    for (index, entry) in entries.into_iter().enumerate() {
        let seed: SeedOrder = match serde_json::from_value(entry) {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable order");
                continue;
            }
        };

        let status = match seed.status.as_deref().map(str::parse::<OrderStatus>) {
            None => OrderStatus::PendingPayment,
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                tracing::warn!(index, error = %e, "skipping order with unknown status");
                continue;
            }
        };

        match store.create(seed.order, status).await {
            Ok(record) => {
                seeded += 1;
                tracing::info!(order_id = %record.order_id(), %status, "order seeded");
            }
            Err(e) => tracing::warn!(index, error = %e, "failed to seed order"),
        }
    }

    tracing::info!(seeded, total, %path, "seeding finished");
}
