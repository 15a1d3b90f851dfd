//! Session-related error types.

use thiserror::Error;

/// Errors reported by a session provider or signer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No signing environment is present.
    #[error("session provider unavailable")]
    ProviderUnavailable,

    /// The user or environment refused account access.
    #[error("account access denied: {0}")]
    Denied(String),

    /// Any other provider failure.
    #[error("session provider error: {0}")]
    Provider(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
