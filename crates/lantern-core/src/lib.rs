//! Core types for the Lantern SDK
//!
//! This crate provides the foundational pieces shared by every other Lantern
//! crate: the ingestion event envelope, the client configuration, and the
//! error type.

pub mod config;
pub mod error;
pub mod event;

// Re-exports
pub use config::LanternConfig;
pub use error::{Error, Result};
pub use event::{now_rfc3339, EventType, IngestionEvent};

/// SDK name reported to the backend in batch metadata and headers.
pub const SDK_NAME: &str = "lantern-rust";

/// SDK version reported to the backend, taken from the crate version.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
