//! # pulse-auth
//!
//! JWT identity resolution for Pulse. The external identity service issues
//! HS256 tokens whose `sub` claim is an opaque user identifier; this crate
//! only verifies and extracts it.
//!
//! Two resolution modes exist:
//!
//! - **strict** ([`TokenVerifier::verify`]) for the administrative HTTP
//!   surface, where a bad token is a hard authentication error
//! - **optional** ([`TokenVerifier::resolve_optional`]) for WebSocket
//!   admission, where absence or failure yields an anonymous connection

pub mod claims;
pub mod verifier;

pub use claims::Claims;
pub use verifier::TokenVerifier;
