//! Connection lifecycle — handles and the locked registry.

pub mod handle;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionInfo, ConnectionMeta};
pub use registry::ConnectionRegistry;
