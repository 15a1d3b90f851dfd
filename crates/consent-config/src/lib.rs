#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the consent ledger client.
//!
//! # Usage
//!
//! ```rust,no_run
//! use consent_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("pinning API: {}", resolved.config.blob_store.api_url);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed by the caller (e.g. `consentctl --config`)
//! 2. **User** (`<platform config dir>/consent-ledger/config.toml`)
//! 3. **Environment variables** (`CONSENT_*`, `PINATA_JWT`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has no dependencies on other internal crates. Conversion from
//! config sections to domain types happens at the integration boundary.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with provenance.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load configuration with an explicit user config directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_dir(
        explicit: Option<&std::path::Path>,
        user_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(user_dir))
    }
}
