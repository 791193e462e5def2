//! # pulse-core
//!
//! Core crate for Pulse. Contains configuration schemas, typed identifiers,
//! the store provider trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Pulse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
