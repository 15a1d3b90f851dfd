//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_session::prelude::*;` to import all essential types.

// Errors
pub use crate::{SessionError, SessionResult};

// Manager and state
pub use crate::{DisconnectReason, SessionEvent, SessionManager, SessionState};

// Provider interface
pub use crate::{ProviderNotification, SessionProvider, TransactionRequest, TransactionSigner};
