//! Process-wide tracing/logging setup for CapStock binaries.

/// Tracing configuration (filters, formatters).
pub mod tracing;

pub use self::tracing::{LogFormat, init, init_with};
