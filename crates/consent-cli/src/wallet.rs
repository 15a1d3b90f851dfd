//! Local signing environment for offline use.
//!
//! Exposes one deterministic account whose transactions go straight to the
//! in-process ledger. It never emits notifications.

use async_trait::async_trait;
use consent_crypto::Address;
use consent_ledger::MemoryLedger;
use consent_session::{
    ProviderNotification, SessionProvider, SessionResult, TransactionSigner,
};
use std::sync::Arc;
use tokio::sync::broadcast;

const WALLET_CONTEXT: &str = "consentctl 2024-01-01 local wallet account";

/// Single-account wallet bound to a [`MemoryLedger`].
pub(crate) struct LocalWallet {
    ledger: MemoryLedger,
    account: Address,
    notifications: broadcast::Sender<ProviderNotification>,
}

impl LocalWallet {
    pub(crate) fn new(ledger: MemoryLedger) -> Arc<Self> {
        let (notifications, _) = broadcast::channel(1);
        Arc::new(Self {
            ledger,
            account: local_account(),
            notifications,
        })
    }
}

/// The wallet's account address.
pub(crate) fn local_account() -> Address {
    let key = blake3::derive_key(WALLET_CONTEXT, b"account-0");
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&key[..20]);
    Address::from_bytes(bytes)
}

#[async_trait]
impl SessionProvider for LocalWallet {
    async fn request_accounts(&self) -> SessionResult<Vec<Address>> {
        Ok(vec![self.account])
    }

    async fn chain_id(&self) -> SessionResult<u64> {
        Ok(31_337)
    }

    async fn balance(&self, _address: &Address) -> SessionResult<u128> {
        Ok(0)
    }

    fn signer(&self, address: &Address) -> SessionResult<Arc<dyn TransactionSigner>> {
        Ok(self.ledger.signer(*address))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification> {
        self.notifications.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_session::SessionManager;

    #[test]
    fn test_account_is_stable() {
        assert_eq!(local_account(), local_account());
        assert!(!local_account().is_zero());
    }

    #[tokio::test]
    async fn test_wallet_connects() {
        let session = SessionManager::new(LocalWallet::new(MemoryLedger::new()));
        assert!(session.connect().await);
        assert_eq!(session.current_address(), Some(local_account()));
    }
}
