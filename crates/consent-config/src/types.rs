//! Configuration types for the consent ledger client.
//!
//! Types here depend on no other internal crate. Every struct implements
//! [`Default`] so that a bare `[section]` header produces a working
//! configuration; conversion into domain types happens at the integration
//! boundary.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pinning service used for off-ledger metadata documents.
    pub blob_store: BlobStoreSection,
    /// Ledger contract location, scan floor and write timeouts.
    pub ledger: LedgerSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// BlobStoreSection
// ---------------------------------------------------------------------------

/// Pinning service endpoint and credential.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BlobStoreSection {
    /// Base URL of the pinning API.
    pub api_url: String,
    /// Public gateway used to build document links.
    pub gateway_url: String,
    /// Bearer JWT. When absent or malformed the client runs in degraded
    /// mode and never touches the network.
    pub jwt: Option<String>,
    /// Request timeout for upload and metadata calls.
    pub upload_timeout_secs: u64,
}

impl std::fmt::Debug for BlobStoreSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreSection")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("has_jwt", &self.jwt.is_some())
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .finish()
    }
}

impl Serialize for BlobStoreSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BlobStoreSection", 3)?;
        state.serialize_field("api_url", &self.api_url)?;
        state.serialize_field("gateway_url", &self.gateway_url)?;
        // jwt is intentionally omitted.
        state.serialize_field("upload_timeout_secs", &self.upload_timeout_secs)?;
        state.end()
    }
}

impl Default for BlobStoreSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud".to_owned(),
            gateway_url: "https://gateway.pinata.cloud/ipfs".to_owned(),
            jwt: None,
            upload_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerSection
// ---------------------------------------------------------------------------

/// Ledger contract location and query/write behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Address of the consent contract (`0x` + 40 hex digits).
    pub contract_address: String,
    /// Hash of the contract's deployment transaction. Its block is the scan
    /// floor for every event query.
    pub deployment_tx: Option<String>,
    /// Scan floor used when no deployment transaction is configured or the
    /// lookup fails.
    pub fallback_scan_floor: u64,
    /// How long a write waits for its transaction receipt.
    pub confirmation_timeout_secs: u64,
    /// Substitute a synthetic dataset when a query errors or finds nothing.
    /// Disable for production deployments.
    pub synthetic_fallback: bool,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            contract_address: "0x0000000000000000000000000000000000000000".to_owned(),
            deployment_tx: None,
            fallback_scan_floor: 0,
            confirmation_timeout_secs: 120,
            synthetic_fallback: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`).
    pub format: String,
    /// Extra filter directives, e.g. `consent_ledger=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
