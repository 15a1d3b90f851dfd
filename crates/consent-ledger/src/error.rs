//! Ledger error types.

use consent_crypto::Address;
use thiserror::Error;

/// Errors from the ledger write path, the event query, or an endpoint.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A write was attempted without a connected session.
    #[error("no connected signing session")]
    NoSession,

    /// No contract code at the configured address. Configuration error.
    #[error("consent contract not deployed at {address}")]
    ContractNotDeployed {
        /// The configured contract address.
        address: Address,
    },

    /// Submission or confirmation of a write failed.
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// The endpoint could not serve a read.
    #[error("ledger RPC error: {0}")]
    Rpc(String),

    /// A log or call did not match the expected schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// Caller input was rejected before reaching the ledger.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Encoding a call failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
