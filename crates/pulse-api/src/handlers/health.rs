//! Health check handler.

use axum::Json;
use axum::extract::State;

use pulse_core::error::AppError;

use crate::dto::{ApiResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
///
/// Reports 503 when the backing store cannot be reached; load balancers
/// key off the status code, not the body.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    if !state.hub.store_healthy().await {
        return Err(AppError::service_unavailable("Store unreachable").into());
    }
    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.hub.connection_count(),
        channels: state.hub.channel_count(),
        store: true,
    })))
}
