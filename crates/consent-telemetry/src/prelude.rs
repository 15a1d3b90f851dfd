//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogTarget, setup_logging};
