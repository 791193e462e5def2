//! WebSocket upgrade handler and per-connection socket loop.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::UserAgent;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use pulse_core::error::ErrorKind;
use pulse_realtime::connection::handle::ConnectionMeta;

use crate::state::AppState;

/// Query parameters for WebSocket admission.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Optional JWT. A missing or invalid token yields an anonymous
    /// connection rather than a rejection.
    pub token: Option<String>,
}

/// GET /ws?token={jwt} — WebSocket upgrade
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    user_agent: Option<TypedHeader<UserAgent>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    let user_id = state.verifier.resolve_optional(query.token.as_deref());
    let meta = ConnectionMeta {
        user_agent: user_agent.map(|TypedHeader(agent)| agent.to_string()),
        remote_addr: Some(remote_addr.to_string()),
    };

    let max_message_bytes = state.config.realtime.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(state, socket, user_id, meta))
}

/// Drives one established WebSocket connection until it closes.
async fn handle_socket(
    state: AppState,
    socket: WebSocket,
    user_id: Option<pulse_core::types::UserId>,
    meta: ConnectionMeta,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = match state.hub.admit(user_id, meta).await {
        Ok(admitted) => admitted,
        Err(err) => {
            debug!(error = %err, "Connection refused");
            let _ = ws_tx
                .send(Message::Text(
                    serde_json::json!({
                        "type": "error",
                        "message": err.message,
                        "timestamp": chrono::Utc::now(),
                    })
                    .to_string()
                    .into(),
                ))
                .await;
            let _ = ws_tx.close().await;
            return;
        }
    };
    let conn_id = handle.id;

    info!(connection_id = %conn_id, "WebSocket connection established");

    // Forward outbound frames onto the socket.
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!(connection_id = %conn_id, error = %err, "Failed to encode frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Err(err) = state.hub.handle_frame(conn_id, &text).await {
                    if err.kind == ErrorKind::UnknownConnection {
                        break;
                    }
                    debug!(connection_id = %conn_id, error = %err, "Frame handling failed");
                }
            }
            Ok(Message::Close(_)) => break,
            // Transport pings are answered by the framework.
            Ok(_) => {}
            Err(err) => {
                warn!(connection_id = %conn_id, error = %err, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.hub.disconnect(conn_id).await;
    info!(connection_id = %conn_id, "WebSocket connection closed");
}
