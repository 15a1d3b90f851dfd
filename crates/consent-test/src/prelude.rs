//! Prelude module - commonly used test utilities.
//!
//! Use `use consent_test::prelude::*;` to import all essential types.

pub use crate::{CountingPinningApi, MockSessionProvider};

pub use crate::{TEST_COUNTERPARTY, TEST_IDENTIFIER, TestLedger, test_account, test_jwt};
