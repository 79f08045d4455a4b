//! Inbound event consumer with bounded redelivery.
//!
//! A message that fails with a retryable error is redelivered with
//! exponential backoff. Once attempts run out, or straight away for a
//! malformed message, it is parked in the dead-letter list. The list keeps
//! the newest [`DEFAULT_DEAD_LETTER_CAPACITY`] entries.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::InboundEvent;
use saga::{CoordinatorError, OrderCoordinator, TransitionOutcome};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Parked messages kept before the oldest is dropped.
pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1000;

/// How often and how fast a failed inbound message is redelivered.
#[derive(Debug, Clone)]
pub struct RedeliveryPolicy {
    /// Total delivery attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RedeliveryPolicy {
    /// Returns the delay that follows `current`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_backoff)
    }
}

/// A message that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub payload: String,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

/// Feeds raw inbound messages to the coordinator.
#[derive(Clone)]
pub struct InboundConsumer {
    coordinator: OrderCoordinator,
    policy: RedeliveryPolicy,
    dead_letters: Arc<Mutex<VecDeque<DeadLetter>>>,
    dead_letter_capacity: usize,
}

impl InboundConsumer {
    pub fn new(coordinator: OrderCoordinator, policy: RedeliveryPolicy) -> Self {
        Self {
            coordinator,
            policy,
            dead_letters: Arc::new(Mutex::new(VecDeque::new())),
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
        }
    }

    /// Sets how many parked messages are kept. Must be at least one.
    pub fn with_dead_letter_capacity(mut self, capacity: usize) -> Self {
        self.dead_letter_capacity = capacity.max(1);
        self
    }

    pub fn policy(&self) -> &RedeliveryPolicy {
        &self.policy
    }

    /// Decodes and applies one message, once.
    pub async fn process(&self, payload: &[u8]) -> Result<TransitionOutcome, CoordinatorError> {
        let event = InboundEvent::from_slice(payload)?;
        self.coordinator.handle_event(event).await
    }

    /// Applies one message, redelivering it while the failure is retryable.
    ///
    /// Returns the last error once the message has been parked.
    pub async fn deliver(&self, payload: &[u8]) -> Result<TransitionOutcome, CoordinatorError> {
        let mut attempt = 1;
        let mut backoff = self.policy.initial_backoff;

        loop {
            match self.process(payload).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "inbound event failed, redelivering"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = self.policy.next_backoff(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    self.park(payload, &e, attempt).await;
                    return Err(e);
                }
            }
        }
    }

    /// Returns the parked messages, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().await.iter().cloned().collect()
    }

    /// Consumes messages from `rx` until every sender is dropped.
    ///
    /// Each message is delivered on its own task so one message waiting out
    /// its backoff does not hold up the rest.
    pub fn spawn(self, mut rx: mpsc::Receiver<Vec<u8>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let consumer = self.clone();
                tokio::spawn(async move {
                    let _ = consumer.deliver(&payload).await;
                });
            }
            tracing::info!("inbound channel closed, consumer stopped");
        })
    }

    async fn park(&self, payload: &[u8], error: &CoordinatorError, attempts: u32) {
        let decoded = InboundEvent::from_slice(payload).ok();
        let letter = DeadLetter {
            event_type: decoded.as_ref().map(|e| e.event_type().to_string()),
            order_id: decoded.as_ref().map(|e| e.order_id().to_string()),
            payload: String::from_utf8_lossy(payload).into_owned(),
            error: error.to_string(),
            attempts,
            failed_at: Utc::now(),
        };

        tracing::error!(
            event_type = letter.event_type.as_deref().unwrap_or("unknown"),
            order_id = letter.order_id.as_deref().unwrap_or(""),
            attempts,
            error = %error,
            "inbound event parked in dead-letter list"
        );
        metrics::counter!("order_dead_letters_total").increment(1);

        let mut letters = self.dead_letters.lock().await;
        while letters.len() >= self.dead_letter_capacity {
            if let Some(dropped) = letters.pop_front() {
                tracing::warn!(
                    order_id = dropped.order_id.as_deref().unwrap_or(""),
                    failed_at = %dropped.failed_at,
                    capacity = self.dead_letter_capacity,
                    "dead-letter list full, dropping oldest entry"
                );
                metrics::counter!("order_dead_letters_dropped_total").increment(1);
            }
        }
        letters.push_back(letter);
    }
}
