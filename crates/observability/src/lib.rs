//! Shared tracing setup for processes embedding the engine.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{DEFAULT_DIRECTIVE, LogFormat, init, init_test, init_with};
