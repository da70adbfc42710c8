//! # discord-common
//!
//! Shared utilities for the gateway client: configuration and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{ConfigError, Configuration};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig, TracingError};
