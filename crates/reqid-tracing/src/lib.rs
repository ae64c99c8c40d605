//! Logging setup and span helpers for reqid services.

pub mod config;
pub mod logging;
pub mod spans;

pub use config::{LogFormat, TracingConfig};
pub use logging::init_tracing;
