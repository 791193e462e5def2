//! `AuthUser` extractor: pulls the JWT from the Authorization header and
//! validates it against the configured verifier.
//!
//! Guards the administrative surface: any handler taking an `AuthUser`
//! rejects the request with 401 before running when the token is missing,
//! malformed, or expired.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pulse_core::error::AppError;
use pulse_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of an administrative endpoint.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let claims = state.verifier.verify(auth_header)?;
        Ok(AuthUser(UserId::new(claims.sub)))
    }
}
