//! Identifier error types.

use thiserror::Error;

/// Errors that can occur while deriving or parsing identifiers.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The raw identifier cannot be used as hash input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid hex encoding.
    #[error("invalid hex encoding: {0}")]
    InvalidHexEncoding(String),
}

/// Result type for identifier operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
