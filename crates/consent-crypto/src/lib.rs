//! Consent Crypto - Identifier primitives for the consent ledger client.
//!
//! This crate provides:
//! - [`SubjectHandle`]: the one-way hash standing in for a raw personal identifier
//! - [`TxId`]: 32-byte ledger transaction identifiers
//! - [`Address`]: 20-byte account and contract addresses
//! - [`ContentRef`]: content identifiers (CIDs) returned by the blob store,
//!   plus generators for CID-shaped synthetic references
//!
//! # Privacy Model
//!
//! Raw identifiers never leave the process. Every ledger write and every
//! query is keyed by the [`SubjectHandle`], a BLAKE3 digest derived under a
//! fixed context string. The handle is the sole correlation key across all
//! events belonging to one subject.
//!
//! # Example
//!
//! ```
//! use consent_crypto::SubjectHandle;
//!
//! let a = SubjectHandle::hash("900101015678").unwrap();
//! let b = SubjectHandle::hash("900101015678").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.to_string().len(), 66);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod address;
mod cid;
mod error;
mod subject;
mod tx;

pub use address::Address;
pub use cid::{CID_V0_PREFIX, ContentRef, SYNTHETIC_CID_LEN};
pub use error::{CryptoError, CryptoResult};
pub use subject::SubjectHandle;
pub use tx::TxId;
