//! Consent Test - Shared test utilities for the consent ledger client.
//!
//! This crate provides mock implementations and test helpers that can be
//! used across the consent crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! consent-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use consent_test::{MockSessionProvider, TestLedger};
//! use consent_session::SessionManager;
//!
//! #[tokio::test]
//! async fn test_connect() {
//!     let ledger = TestLedger::deployed();
//!     let provider = MockSessionProvider::new(ledger.ledger.clone());
//!     let session = SessionManager::new(provider.clone());
//!
//!     assert!(session.connect().await);
//!     assert_eq!(provider.request_count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
