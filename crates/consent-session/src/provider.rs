//! Traits for the external signing environment.
//!
//! The session manager talks to the wallet only through these traits.

use async_trait::async_trait;
use consent_crypto::{Address, TxId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::SessionResult;

/// Asynchronous notification pushed by the signing environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderNotification {
    /// The set of exposed accounts changed. Empty means the user locked or
    /// disconnected the wallet.
    AccountsChanged {
        /// Accounts now exposed, active account first.
        accounts: Vec<Address>,
    },
    /// The wallet switched to another chain.
    ChainChanged {
        /// New chain id.
        chain_id: u64,
    },
}

/// An unsigned transaction handed to the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Target contract.
    pub to: Address,
    /// Encoded call data.
    pub data: Vec<u8>,
}

/// Capability to sign and submit transactions for one account.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// The account this signer signs for.
    fn address(&self) -> Address;

    /// Sign and broadcast a transaction, returning its id once accepted by
    /// the endpoint (not once confirmed).
    async fn send_transaction(&self, request: TransactionRequest) -> SessionResult<TxId>;
}

/// The signing environment (wallet) a session is established against.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Whether a signing environment is present at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the user for account access. Returns the exposed accounts,
    /// active account first.
    async fn request_accounts(&self) -> SessionResult<Vec<Address>>;

    /// Current chain id.
    async fn chain_id(&self) -> SessionResult<u64>;

    /// Native balance of an account, in the chain's smallest unit.
    async fn balance(&self, address: &Address) -> SessionResult<u128>;

    /// Obtain a signer for an exposed account.
    fn signer(&self, address: &Address) -> SessionResult<Arc<dyn TransactionSigner>>;

    /// Subscribe to account and chain notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification>;
}
