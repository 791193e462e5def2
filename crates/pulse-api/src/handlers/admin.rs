//! Administrative handlers: broadcast, direct send, and connection and
//! channel inspection. Every endpoint here requires a valid Bearer token.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::debug;

use pulse_core::error::AppError;
use pulse_core::types::{ConnectionId, UserId};
use pulse_realtime::connection::handle::ConnectionInfo;
use pulse_realtime::message::frames::{
    BroadcastOutcome, BroadcastRequest, ChannelStats, DeliveryOutcome,
};

use crate::dto::{ApiResponse, SendRequest};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<ApiResponse<BroadcastOutcome>>, ApiError> {
    if request.channel.is_empty() {
        return Err(AppError::validation("Channel must not be empty").into());
    }
    debug!(caller = %caller, channel = %request.channel, "Administrative broadcast");
    let outcome = state.hub.broadcast(request).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/send/{user_id}
pub async fn send_to_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
    Json(request): Json<SendRequest>,
) -> Json<ApiResponse<DeliveryOutcome>> {
    debug!(caller = %caller, target = %user_id, "Administrative direct send");
    let outcome = state
        .hub
        .send_to_user(&UserId::from(user_id), request.event, request.payload);
    Json(ApiResponse::ok(outcome))
}

/// GET /api/connections
pub async fn list_connections(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<ApiResponse<Vec<ConnectionInfo>>> {
    Json(ApiResponse::ok(state.hub.list_connections()))
}

/// GET /api/connections/{id}
pub async fn get_connection(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(conn_id): Path<ConnectionId>,
) -> Result<Json<ApiResponse<ConnectionInfo>>, ApiError> {
    let info = state
        .hub
        .connection_info(&conn_id)
        .ok_or_else(|| AppError::unknown_connection(format!("Connection {conn_id}")))?;
    Ok(Json(ApiResponse::ok(info)))
}

/// DELETE /api/connections/{id}
pub async fn disconnect_connection(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(conn_id): Path<ConnectionId>,
) -> Result<StatusCode, ApiError> {
    if state.hub.connection_info(&conn_id).is_none() {
        return Err(AppError::unknown_connection(format!("Connection {conn_id}")).into());
    }
    debug!(caller = %caller, connection_id = %conn_id, "Administrative disconnect");
    state.hub.disconnect(conn_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/channels/{channel}/stats
pub async fn channel_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(channel): Path<String>,
) -> Json<ApiResponse<ChannelStats>> {
    Json(ApiResponse::ok(state.hub.channel_stats(&channel).await))
}
