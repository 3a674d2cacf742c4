//! Request handlers for the gateway host.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::gateway::{GatewayClient, GatewayError, NetworkErrorKind};
use crate::health::HealthStatus;
use crate::resilience::CancelSignal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: GatewayClient,
    /// Fires on process shutdown; in-flight calls stop with `Cancelled`.
    pub shutdown: CancelSignal,
}

/// A gateway error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for a gateway error.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
        GatewayError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::CircuitOpen { .. } | GatewayError::Authentication { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        GatewayError::Network {
            kind: NetworkErrorKind::Cancelled,
            ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Network { .. } | GatewayError::Server { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = Json(json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.user_facing_message(),
            }
        }));

        let mut response = (status, body).into_response();
        if let GatewayError::RateLimit { retry_after_ms } = self.0 {
            let secs = retry_after_ms.div_ceil(1_000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// `GET /health`: 200 while serving (healthy or degraded), 503 when unhealthy.
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.client.health_check().await;
    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report)).into_response()
}

/// `GET /payment-methods`
pub async fn payment_methods(State(state): State<AppState>) -> Result<Response, ApiError> {
    let methods = state
        .client
        .get_payment_methods_with_cancel(&state.shutdown)
        .await?;
    Ok(Json(methods).into_response())
}

/// `GET /transactions/{id}`
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let status = state
        .client
        .get_transaction_status_with_cancel(&id, &state.shutdown)
        .await?;
    Ok(Json(status).into_response())
}
