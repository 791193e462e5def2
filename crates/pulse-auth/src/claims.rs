//! JWT claims structure accepted from the identity service.

use serde::{Deserialize, Serialize};

/// Claims payload embedded in every token Pulse accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the opaque user identifier.
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}
