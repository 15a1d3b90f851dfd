//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_ledger::prelude::*;` to import all essential types.

pub use crate::{LedgerError, LedgerResult};

pub use crate::{ActionType, AuditEvent, LedgerRef, Origin, Receipt};

pub use crate::{EventQuery, LedgerWriter, QueryConfig, SyntheticFallback};

pub use crate::{LedgerEndpoint, MemoryLedger};

pub use consent_crypto::{Address, ContentRef, SubjectHandle, TxId};
