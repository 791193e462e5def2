//! Integration tests for administrative authentication.
//!
//! Every /api endpoint except the health check requires a valid Bearer
//! token and rejects anything else with a hard 401.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_broadcast_without_token_is_401() {
    let app = TestApp::new().await;
    let (_handle, mut rx) = app.connect_subscribed("alice", "room-1").await;

    let response = app
        .request(
            "POST",
            "/api/broadcast",
            Some(serde_json::json!({
                "channel": "room-1",
                "event": "created",
                "payload": {},
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "AUTHENTICATION");
    // The handler never ran, so nothing was delivered.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_list_connections_without_token_is_401() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/connections", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let app = TestApp::new().await;

    let response = app
        .request_with_token("GET", "/api/connections", "not-a-jwt")
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_every_admin_endpoint_requires_a_token() {
    let app = TestApp::new().await;
    let id = uuid::Uuid::new_v4();

    for (method, path) in [
        ("POST", "/api/send/alice".to_string()),
        ("GET", format!("/api/connections/{id}")),
        ("DELETE", format!("/api/connections/{id}")),
        ("GET", "/api/channels/room-1/stats".to_string()),
    ] {
        let body = (method == "POST")
            .then(|| serde_json::json!({"event": "notice", "payload": {}}));
        let response = app.request(method, &path, body).await;
        assert_eq!(
            response.status,
            StatusCode::UNAUTHORIZED,
            "{method} {path} should be guarded"
        );
    }
}

#[tokio::test]
async fn test_health_check_stays_open() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
}
