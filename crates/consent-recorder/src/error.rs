//! Recorder error types.

use consent_blobstore::BlobError;
use consent_crypto::Address;
use consent_ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by [`crate::ConsentRecorder`].
///
/// Ledger write failures other than a missing contract never appear here;
/// they degrade to a synthetic receipt.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Identifier, counterparty or action was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The metadata document could not be stored.
    #[error("metadata upload failed: {0}")]
    UploadFailed(#[from] BlobError),

    /// No contract code at the configured address.
    #[error("consent contract not deployed at {address}")]
    ContractNotDeployed {
        /// The configured contract address.
        address: Address,
    },

    /// A history query failed with the synthetic fallback disabled.
    #[error("query failed: {0}")]
    Query(#[from] LedgerError),
}

/// Result type for recorder operations.
pub type RecorderResult<T> = Result<T, RecorderError>;
