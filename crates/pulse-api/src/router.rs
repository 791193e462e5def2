//! Route definitions for the Pulse HTTP surface.

use axum::http::HeaderValue;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/broadcast", post(handlers::admin::broadcast))
        .route("/send/{user_id}", post(handlers::admin::send_to_user))
        .route("/connections", get(handlers::admin::list_connections))
        .route("/connections/{id}", get(handlers::admin::get_connection))
        .route(
            "/connections/{id}",
            delete(handlers::admin::disconnect_connection),
        )
        .route(
            "/channels/{channel}/stats",
            get(handlers::admin::channel_stats),
        )
        .route("/health", get(handlers::health::health));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS layer from the configured origin list. A literal `*` opens the
/// surface to any origin.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors_origins;
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}
