//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_blobstore::prelude::*;` to import all essential types.

pub use crate::{BlobError, BlobResult};

pub use crate::{BlobStoreClient, BlobStoreConfig, DocumentKind, PinningApi};
