//! Blob store error types.

use thiserror::Error;

/// Errors that can occur talking to the pinning service.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The service answered with a non-success status.
    #[error("upload failed with status {status}: {body}")]
    UploadFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
