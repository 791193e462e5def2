//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use pulse_core::config::auth::AuthConfig;
use pulse_core::error::AppError;
use pulse_core::types::UserId;

use super::claims::Claims;

/// Validates JWT tokens issued by the external identity service.
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string.
    ///
    /// Accepts a raw token or a `Bearer `-prefixed header value. Used by the
    /// administrative surface where a bad token is a hard rejection.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let token = strip_bearer(token);
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Resolves an optional credential to an optional user id.
    ///
    /// Absence or failure yields `None` — an anonymous connection — never an
    /// error that blocks admission.
    pub fn resolve_optional(&self, token: Option<&str>) -> Option<UserId> {
        let token = token?;
        match self.verify(token) {
            Ok(claims) => Some(UserId::new(claims.sub)),
            Err(e) => {
                debug!(error = %e, "Credential rejected, admitting as anonymous");
                None
            }
        }
    }
}

/// Strip an optional `Bearer ` prefix from a header value.
fn strip_bearer(token: &str) -> &str {
    token.strip_prefix("Bearer ").unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            leeway_seconds: 0,
        }
    }

    fn token_for(sub: &str, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn verify_accepts_a_valid_token() {
        let verifier = TokenVerifier::new(&config());
        let claims = verifier.verify(&token_for("user-1", 3600)).expect("valid");
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn verify_accepts_bearer_prefixed_tokens() {
        let verifier = TokenVerifier::new(&config());
        let header = format!("Bearer {}", token_for("user-1", 3600));
        assert!(verifier.verify(&header).is_ok());
    }

    #[test]
    fn verify_rejects_an_expired_token() {
        let verifier = TokenVerifier::new(&config());
        assert!(verifier.verify(&token_for("user-1", -3600)).is_err());
    }

    #[test]
    fn resolve_optional_never_fails() {
        let verifier = TokenVerifier::new(&config());
        assert_eq!(verifier.resolve_optional(None), None);
        assert_eq!(verifier.resolve_optional(Some("garbage")), None);
        assert_eq!(
            verifier.resolve_optional(Some(&token_for("user-1", 3600))),
            Some(UserId::new("user-1"))
        );
    }
}
