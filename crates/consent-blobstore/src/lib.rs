//! Consent Blob Store - Off-ledger storage of consent documents.
//!
//! Documents are pinned to a content-addressed store and referenced from the
//! ledger by CID. Without a usable credential the client falls back to
//! synthetic CIDs and performs no network I/O.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod api;
mod client;
mod credential;
mod error;

pub use api::{HttpPinningApi, MetadataUpdate, PinMetadata, PinRequest, PinningApi};
pub use client::{APP_TAG, BlobStoreClient, BlobStoreConfig, DocumentKind};
pub use credential::is_structurally_valid_jwt;
pub use error::{BlobError, BlobResult};
