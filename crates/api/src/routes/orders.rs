//! Order placement and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, UserId};
use domain::{CardDetails, NewOrder, OrderStatusView};
use order_store::OrderRecord;

use crate::AppState;
use crate::error::ApiError;

/// POST /orders/add/{userid} — places an order for the user in the path.
///
/// The path owner replaces any `userid` in the body.
pub async fn add_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderStatusView>), ApiError> {
    let Json(new_order) = body?;
    place(&state, new_order.with_user(UserId::new(user_id))).await
}

/// POST /orders — places an order for the `userid` in the body.
pub async fn add(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderStatusView>), ApiError> {
    let Json(new_order) = body?;
    place(&state, new_order).await
}

async fn place(
    state: &AppState,
    new_order: NewOrder,
) -> Result<(StatusCode, Json<OrderStatusView>), ApiError> {
    let view = state.coordinator.place_order(new_order).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /orders — lists every order.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<OrderRecord>>, ApiError> {
    Ok(Json(state.coordinator.all_orders().await?))
}

/// GET /orders/user/{userid} — lists the orders of one user.
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderRecord>>, ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("User ID is required".to_string()));
    }
    let orders = state.coordinator.user_orders(&UserId::new(user_id)).await?;
    Ok(Json(orders))
}

/// GET /orders/{id} — gets a single order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderRecord>, ApiError> {
    let order = state.coordinator.get_order(&OrderId::new(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/payment/retry — re-sends a payment request that could
/// not be handed off. The card is supplied again since it was never stored.
pub async fn retry_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CardDetails>, JsonRejection>,
) -> Result<Json<OrderStatusView>, ApiError> {
    let Json(card) = body?;
    let view = state
        .coordinator
        .retry_payment_request(&OrderId::new(id), card)
        .await?;
    Ok(Json(view))
}
