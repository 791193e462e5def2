//! Integration tests for the broadcast and direct-send endpoints.

use http::StatusCode;

use pulse_realtime::message::frames::OutboundFrame;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_broadcast_reaches_subscribers() {
    let app = TestApp::new().await;
    let (_alice, mut alice_rx) = app.connect_subscribed("alice", "room-1").await;
    let (_bob, mut bob_rx) = app.connect_subscribed("bob", "room-1").await;

    let response = app
        .authed_request(
            "POST",
            "/api/broadcast",
            Some(serde_json::json!({
                "channel": "room-1",
                "event": "created",
                "payload": {"n": 1},
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["sent_count"], 2);
    assert_eq!(response.body["data"]["failed_count"], 0);

    for rx in [&mut alice_rx, &mut bob_rx] {
        let frame = rx.try_recv().expect("broadcast frame");
        let OutboundFrame::Broadcast { message } = frame else {
            panic!("expected broadcast frame");
        };
        assert_eq!(message.event, "created");
    }
}

#[tokio::test]
async fn test_broadcast_exclude_filter() {
    let app = TestApp::new().await;
    let (_alice, mut alice_rx) = app.connect_subscribed("alice", "room-1").await;
    let (_bob, mut bob_rx) = app.connect_subscribed("bob", "room-1").await;

    let response = app
        .authed_request(
            "POST",
            "/api/broadcast",
            Some(serde_json::json!({
                "channel": "room-1",
                "event": "created",
                "payload": {},
                "exclude_user_ids": ["bob"],
            })),
        )
        .await;

    assert_eq!(response.body["data"]["sent_count"], 1);
    assert!(alice_rx.try_recv().is_ok());
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_broadcast_to_empty_channel() {
    let app = TestApp::new().await;

    let response = app
        .authed_request(
            "POST",
            "/api/broadcast",
            Some(serde_json::json!({
                "channel": "nobody-home",
                "event": "created",
                "payload": {},
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["sent_count"], 0);
}

#[tokio::test]
async fn test_broadcast_empty_channel_name_rejected() {
    let app = TestApp::new().await;

    let response = app
        .authed_request(
            "POST",
            "/api/broadcast",
            Some(serde_json::json!({
                "channel": "",
                "event": "created",
                "payload": {},
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_send_hits_every_user_connection() {
    let app = TestApp::new().await;
    let (_a1, mut rx1) = app.connect_subscribed("alice", "room-1").await;
    let (_a2, mut rx2) = app.connect_subscribed("alice", "room-2").await;
    let (_bob, mut bob_rx) = app.connect_subscribed("bob", "room-1").await;

    let response = app
        .authed_request(
            "POST",
            "/api/send/alice",
            Some(serde_json::json!({
                "event": "notice",
                "payload": {"text": "hi"},
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["sent_count"], 2);

    for rx in [&mut rx1, &mut rx2] {
        let frame = rx.try_recv().expect("direct frame");
        assert!(matches!(frame, OutboundFrame::Direct { .. }));
    }
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_direct_send_to_offline_user() {
    let app = TestApp::new().await;

    let response = app
        .authed_request(
            "POST",
            "/api/send/nobody",
            Some(serde_json::json!({"event": "notice", "payload": {}})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["sent_count"], 0);
}
