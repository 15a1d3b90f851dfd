//! Consent Telemetry - Logging for the consent ledger client.
//!
//! # Example
//!
//! ```rust,no_run
//! use consent_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), consent_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("consent_ledger=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
