//! Prelude module - commonly used types for convenient import.
//!
//! Use `use consent_recorder::prelude::*;` to import all essential types.

pub use crate::{RecorderError, RecorderResult};

pub use crate::{ConsentRecorder, RecordResult};

pub use consent_ledger::{ActionType, AuditEvent, Origin, Receipt};
