//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Identifiers
pub use crate::{Address, ContentRef, SubjectHandle, TxId};
