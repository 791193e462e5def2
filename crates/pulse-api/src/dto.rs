//! Request and response envelopes for the administrative surface.

use serde::{Deserialize, Serialize};

/// Standard success envelope wrapping every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` on the success path.
    pub success: bool,
    /// Response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in the success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Body of a direct-send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Event name.
    pub event: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
}

/// Body of a health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status, `ok` or `degraded`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Live connection count.
    pub connections: usize,
    /// Active channel count.
    pub channels: usize,
    /// Whether the store backend answered its health probe.
    pub store: bool,
}
