//! Consent Recorder - Records consent actions end to end.
//!
//! [`ConsentRecorder::record`] hashes the identifier, stores a metadata
//! document in the blob store, writes the action to the ledger when a
//! signing session is connected, and otherwise returns a synthetic receipt.
//! Every result carries its [`Origin`](consent_ledger::Origin).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod recorder;

pub use error::{RecorderError, RecorderResult};
pub use recorder::{ConsentRecorder, RecordResult, document_kind};
