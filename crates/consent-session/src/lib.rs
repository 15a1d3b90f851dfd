//! Consent Session - Signing-session lifecycle.
//!
//! This crate provides:
//! - [`SessionProvider`] and [`TransactionSigner`]: the interface to the
//!   external signing environment (wallet)
//! - [`SessionManager`]: the single owner of the signer binding, driven by
//!   explicit `connect()` calls and by provider notifications
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──granted──▶ Connected(address)
//!      ▲                          │                        │
//!      └──────────denied──────────┘                        │
//!      └──── accounts cleared / account switched / chain changed ─┘
//! ```
//!
//! A chain change forces `Disconnected` and emits
//! [`SessionEvent::ChainChanged`]; callers reconnect when ready.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod manager;
mod provider;

pub use error::{SessionError, SessionResult};
pub use manager::{
    ConnectedSession, DEFAULT_EVENT_CAPACITY, DisconnectReason, SessionEvent, SessionManager,
    SessionState,
};
pub use provider::{ProviderNotification, SessionProvider, TransactionRequest, TransactionSigner};
