//! Inbound event endpoints used by the payment and shipment services.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use domain::{CreditCardValidated, Envelope, InboundEvent, ShipmentStatusUpdate};
use saga::TransitionOutcome;
use serde::Serialize;

use crate::AppState;
use crate::consumer::DeadLetter;
use crate::error::ApiError;

/// Result of applying an inbound event.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub order_id: String,
    pub event_type: &'static str,
    /// `"applied"` or `"duplicate"`.
    pub outcome: &'static str,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
}

impl EventResponse {
    fn new(event: &InboundEvent, outcome: TransitionOutcome) -> Self {
        let (outcome, status, previous_status) = match outcome {
            TransitionOutcome::Applied { from, to } => ("applied", to, Some(from.to_string())),
            TransitionOutcome::AlreadyApplied { current } => ("duplicate", current, None),
        };
        Self {
            order_id: event.order_id().to_string(),
            event_type: event.event_type(),
            outcome,
            status: status.to_string(),
            previous_status,
        }
    }
}

/// POST /events/payment — applies a `CreditCardValidated` envelope.
pub async fn payment(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<EventResponse>, ApiError> {
    let envelope = Envelope::<CreditCardValidated>::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    apply(&state, InboundEvent::PaymentValidated(envelope)).await
}

/// POST /events/shipment — applies a shipment status update envelope.
pub async fn shipment(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<EventResponse>, ApiError> {
    let envelope = Envelope::<ShipmentStatusUpdate>::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    apply(&state, InboundEvent::ShipmentStatus(envelope)).await
}

/// POST /events — applies any inbound envelope, routed by `metadata.type`.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<EventResponse>, ApiError> {
    let event = InboundEvent::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    apply(&state, event).await
}

/// GET /events/dead-letters — lists messages the consumer gave up on.
pub async fn dead_letters(State(state): State<Arc<AppState>>) -> Json<Vec<DeadLetter>> {
    Json(state.consumer.dead_letters().await)
}

async fn apply(state: &AppState, event: InboundEvent) -> Result<Json<EventResponse>, ApiError> {
    let outcome = state.coordinator.handle_event(event.clone()).await?;
    Ok(Json(EventResponse::new(&event, outcome)))
}
