//! Integration tests for the Pulse HTTP surface.

mod helpers;

mod admin_test;
mod auth_test;
mod broadcast_test;
mod ws_test;
