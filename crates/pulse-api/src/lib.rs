//! # pulse-api
//!
//! HTTP layer for Pulse built on Axum.
//!
//! Provides the WebSocket upgrade endpoint, the administrative REST surface
//! (broadcast, direct send, connection and channel inspection), health
//! checks, and the mapping from domain errors to HTTP responses.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
