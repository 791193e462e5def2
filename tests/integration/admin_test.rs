//! Integration tests for connection and channel inspection endpoints.

use std::sync::Arc;

use http::StatusCode;

use crate::helpers::{TestApp, UnreachableStore};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["connections"], 0);
    assert_eq!(data["store"], true);
}

#[tokio::test]
async fn test_health_check_is_503_when_store_is_down() {
    let app = TestApp::with_store(Arc::new(UnreachableStore));

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_list_connections() {
    let app = TestApp::new().await;
    let (handle, _rx) = app.connect_subscribed("alice", "room-1").await;

    let response = app.authed_request("GET", "/api/connections", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let connections = response.body["data"].as_array().expect("array");
    assert_eq!(connections.len(), 1);
    assert_eq!(
        connections[0]["connection_id"],
        serde_json::json!(handle.id)
    );
    assert_eq!(connections[0]["user_id"], "alice");
}

#[tokio::test]
async fn test_get_connection_by_id() {
    let app = TestApp::new().await;
    let (handle, _rx) = app.connect_subscribed("alice", "room-1").await;

    let response = app
        .authed_request("GET", &format!("/api/connections/{}", handle.id), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["channels"].as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn test_get_unknown_connection_is_404() {
    let app = TestApp::new().await;

    let id = uuid::Uuid::new_v4();
    let response = app
        .authed_request("GET", &format!("/api/connections/{id}"), None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "UNKNOWN_CONNECTION");
}

#[tokio::test]
async fn test_force_disconnect() {
    let app = TestApp::new().await;
    let (handle, _rx) = app.connect_subscribed("alice", "room-1").await;

    let response = app
        .authed_request("DELETE", &format!("/api/connections/{}", handle.id), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.hub.connection_count(), 0);

    // Deleting it again is a 404.
    let response = app
        .authed_request("DELETE", &format!("/api/connections/{}", handle.id), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_channel_stats() {
    let app = TestApp::new().await;
    let (_handle, mut rx) = app.connect_subscribed("alice", "room-1").await;

    app.authed_request(
        "POST",
        "/api/broadcast",
        Some(serde_json::json!({
            "channel": "room-1",
            "event": "created",
            "payload": {"n": 1},
        })),
    )
    .await;
    rx.try_recv().expect("broadcast frame");

    let response = app
        .authed_request("GET", "/api/channels/room-1/stats", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["subscriber_count"], 1);
    assert_eq!(data["message_count"], 1);
    assert!(!data["last_activity"].is_null());
}

#[tokio::test]
async fn test_stats_for_idle_channel() {
    let app = TestApp::new().await;

    let response = app
        .authed_request("GET", "/api/channels/nothing-here/stats", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["subscriber_count"], 0);
    assert_eq!(data["message_count"], 0);
    assert!(data["last_activity"].is_null());
}
