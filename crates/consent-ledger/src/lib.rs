//! Consent Ledger - Writes consent actions to the ledger and reads them back.
//!
//! This crate provides:
//! - [`LedgerWriter`]: submits grant, revoke and usage actions through the
//!   session's signer and waits for confirmation
//! - [`EventQuery`]: merges the three event streams into one deduplicated,
//!   newest-first audit trail, with an optional synthetic fallback
//! - [`LedgerEndpoint`]: read access to a ledger node
//! - [`MemoryLedger`]: an in-process ledger for offline use and tests
//!
//! # Example
//!
//! ```rust,no_run
//! use consent_ledger::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> LedgerResult<()> {
//! let ledger = MemoryLedger::new();
//! let contract = Address::from_bytes([0xc0; 20]);
//! let deployment = ledger.deploy(contract)?;
//!
//! let query = EventQuery::new(
//!     Arc::new(ledger),
//!     QueryConfig::new(contract).with_deployment_tx(deployment),
//! );
//! let events = query.query_identifier("900101015678").await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod abi;
mod endpoint;
mod error;
mod memory;
mod query;
mod summary;
pub mod synthetic;
mod types;
mod writer;

pub use abi::{EventCategory, LedgerCall, RawLog};
pub use endpoint::{LedgerEndpoint, LogFilter, TxReceipt};
pub use error::{LedgerError, LedgerResult};
pub use memory::{BASE_GAS, BLOCK_INTERVAL_SECS, GAS_PER_BYTE, MemoryLedger};
pub use query::{EventQuery, QueryConfig, SyntheticFallback, normalize};
pub use summary::{ConsentState, ConsentSummary, CounterpartySummary, summarize};
pub use types::{ActionType, AuditEvent, DELETION_REQUESTED, LedgerRef, Origin, Receipt};
pub use writer::{DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL, LedgerWriter};
