//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use pulse_api::AppState;
use pulse_auth::Claims;
use pulse_core::config::AppConfig;
use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::store::StoreProvider;
use pulse_core::types::UserId;
use pulse_realtime::RealtimeHub;
use pulse_realtime::connection::handle::ConnectionMeta;
use pulse_realtime::message::frames::{OutboundFrame, SubscriptionConfig};
use pulse_store::StoreManager;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The realtime hub, for setting up connections directly
    pub hub: Arc<RealtimeHub>,
    /// The configuration the app was built with
    pub config: Arc<AppConfig>,
}

/// A decoded test response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Create a new test application over the in-memory store
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let store = StoreManager::new(&config.store)
            .await
            .expect("Failed to init store");
        Self::build(config, store.provider())
    }

    /// Create a test application over a specific store provider
    pub fn with_store(provider: Arc<dyn StoreProvider>) -> Self {
        Self::build(AppConfig::default(), provider)
    }

    fn build(config: AppConfig, provider: Arc<dyn StoreProvider>) -> Self {
        let config = Arc::new(config);
        let hub = Arc::new(RealtimeHub::new(provider, config.realtime.clone()));
        let router = pulse_api::build_router(AppState::new(config.clone(), hub.clone()))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4242))));
        Self {
            router,
            hub,
            config,
        }
    }

    /// Mint a token the app's verifier accepts
    pub fn token_for(&self, sub: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .expect("encode token")
    }

    /// Make a request without credentials and decode the JSON body (if any)
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        self.dispatch(method, path, body, None).await
    }

    /// Make a request carrying a valid admin Bearer token
    pub async fn authed_request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let token = self.token_for("admin");
        self.dispatch(method, path, body, Some(&token)).await
    }

    /// Make a request carrying an arbitrary token string
    pub async fn request_with_token(
        &self,
        method: &str,
        path: &str,
        token: &str,
    ) -> TestResponse {
        self.dispatch(method, path, None, Some(token)).await
    }

    async fn dispatch(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    /// Admit a connection subscribed to a channel, bypassing the socket layer
    pub async fn connect_subscribed(
        &self,
        user: &str,
        channel: &str,
    ) -> (
        Arc<pulse_realtime::ConnectionHandle>,
        tokio::sync::mpsc::Receiver<OutboundFrame>,
    ) {
        let (handle, mut rx) = self
            .hub
            .admit(Some(UserId::from(user)), ConnectionMeta::default())
            .await
            .expect("Failed to admit connection");
        rx.try_recv().expect("connection ack");
        self.hub
            .subscribe(handle.id, channel, SubscriptionConfig::default())
            .await
            .expect("Failed to subscribe");
        rx.try_recv().expect("subscription ack");
        (handle, rx)
    }
}

/// A store whose every operation fails, for exercising degraded paths.
#[derive(Debug)]
pub struct UnreachableStore;

impl UnreachableStore {
    fn error() -> AppError {
        AppError::store("Store connection refused")
    }
}

#[async_trait]
impl StoreProvider for UnreachableStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(Self::error())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(Self::error())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(Self::error())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<bool> {
        Err(Self::error())
    }

    async fn push_capped(&self, _key: &str, _value: &str, _max_len: u64) -> AppResult<()> {
        Err(Self::error())
    }

    async fn range(&self, _key: &str, _start: i64, _stop: i64) -> AppResult<Vec<String>> {
        Err(Self::error())
    }

    async fn list_len(&self, _key: &str) -> AppResult<u64> {
        Err(Self::error())
    }

    async fn set_add(&self, _key: &str, _member: &str) -> AppResult<()> {
        Err(Self::error())
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> AppResult<()> {
        Err(Self::error())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Err(Self::error())
    }
}
