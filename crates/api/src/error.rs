//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use emitter::EmitError;
use order_store::StoreError;
use saga::CoordinatorError;
use thiserror::Error;

use crate::config::ConfigError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Coordinator error.
    Coordinator(CoordinatorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Coordinator(err) => coordinator_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn coordinator_error_to_response(err: CoordinatorError) -> (StatusCode, String) {
    let status = match &err {
        CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
        CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
        CoordinatorError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoordinatorError::StorageWrite(StoreError::ConcurrencyConflict { .. })
        | CoordinatorError::StorageWrite(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
        CoordinatorError::StorageRead(StoreError::Corrupt { .. })
        | CoordinatorError::StorageWrite(StoreError::Corrupt { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CoordinatorError::StorageRead(_) | CoordinatorError::StorageWrite(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CoordinatorError::Emit(_) => StatusCode::BAD_GATEWAY,
        CoordinatorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, %status, "request failed");
    }
    (status, err.to_string())
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError::Coordinator(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Errors that abort start-up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Emit(#[from] EmitError),
}

#[cfg(test)]
mod tests {
    use common::OrderId;
    use domain::{OrderStatus, ValidationError};
    use order_store::Version;

    use super::*;

    fn status_of(err: CoordinatorError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[tokio::test]
    async fn test_bad_request_carries_message() {
        let response = ApiError::BadRequest("User ID is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "User ID is required");
    }

    #[test]
    fn test_coordinator_errors_map_to_status_codes() {
        let id = OrderId::new("o-1");

        assert_eq!(
            status_of(CoordinatorError::Validation(ValidationError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoordinatorError::NotFound(id.clone())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoordinatorError::InvalidTransition {
                order_id: id.clone(),
                from: OrderStatus::PendingPayment,
                to: OrderStatus::Shipped,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoordinatorError::StorageWrite(
                StoreError::ConcurrencyConflict {
                    order_id: id.clone(),
                    expected: Version::new(1),
                    actual: Version::new(2),
                }
            )),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoordinatorError::StorageRead(StoreError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(CoordinatorError::StorageRead(StoreError::Corrupt {
                order_id: id,
                reason: "bad json".to_string(),
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoordinatorError::Emit(EmitError::Closed)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CoordinatorError::Timeout {
                operation: "get",
                after: std::time::Duration::from_secs(1),
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
