//! Mock implementations for testing.

use async_trait::async_trait;
use consent_blobstore::{BlobError, BlobResult, MetadataUpdate, PinRequest, PinningApi};
use consent_crypto::{Address, ContentRef};
use consent_ledger::MemoryLedger;
use consent_session::{
    ProviderNotification, SessionError, SessionProvider, SessionResult, TransactionSigner,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::fixtures::{TEST_CHAIN_ID, test_account};

/// Wallet stand-in whose signers submit to a [`MemoryLedger`].
///
/// Counts account requests so tests can assert that `connect()` did or did
/// not reach the provider.
#[derive(Debug)]
pub struct MockSessionProvider {
    ledger: MemoryLedger,
    accounts: Mutex<Vec<Address>>,
    chain_id: AtomicU64,
    available: AtomicBool,
    deny: AtomicBool,
    requests: AtomicUsize,
    balance: u128,
    notifications: broadcast::Sender<ProviderNotification>,
}

impl MockSessionProvider {
    /// A provider exposing [`test_account(1)`](test_account).
    #[must_use]
    pub fn new(ledger: MemoryLedger) -> Arc<Self> {
        Self::with_accounts(ledger, vec![test_account(1)])
    }

    /// A provider exposing `accounts`, first one active.
    #[must_use]
    pub fn with_accounts(ledger: MemoryLedger, accounts: Vec<Address>) -> Arc<Self> {
        let (notifications, _) = broadcast::channel(16);
        Arc::new(Self {
            ledger,
            accounts: Mutex::new(accounts),
            chain_id: AtomicU64::new(TEST_CHAIN_ID),
            available: AtomicBool::new(true),
            deny: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            balance: 1_000_000_000_000_000_000,
            notifications,
        })
    }

    /// Simulate a missing signing environment.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make the user reject the next account requests.
    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Number of account requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Change the exposed accounts and notify subscribers.
    pub fn switch_accounts(&self, accounts: Vec<Address>) {
        if let Ok(mut guard) = self.accounts.lock() {
            guard.clone_from(&accounts);
        }
        let _ = self
            .notifications
            .send(ProviderNotification::AccountsChanged { accounts });
    }

    /// Change the chain and notify subscribers.
    pub fn switch_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        let _ = self
            .notifications
            .send(ProviderNotification::ChainChanged { chain_id });
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_accounts(&self) -> SessionResult<Vec<Address>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(SessionError::Denied("user rejected the request".to_string()));
        }
        self.accounts
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| SessionError::Provider("account list poisoned".to_string()))
    }

    async fn chain_id(&self) -> SessionResult<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn balance(&self, _address: &Address) -> SessionResult<u128> {
        Ok(self.balance)
    }

    fn signer(&self, address: &Address) -> SessionResult<Arc<dyn TransactionSigner>> {
        Ok(self.ledger.signer(*address))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification> {
        self.notifications.subscribe()
    }
}

/// Pinning API that counts calls and never touches the network.
///
/// Returned CIDs are derived from the pinned content, so identical
/// documents get identical references.
#[derive(Debug, Default)]
pub struct CountingPinningApi {
    pins: AtomicUsize,
    updates: AtomicUsize,
    fail_pin: AtomicBool,
    fail_metadata: AtomicBool,
    pinned: Mutex<Vec<PinRequest>>,
}

impl CountingPinningApi {
    /// Create a new counting API.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make pin requests fail with a 401.
    pub fn set_fail_pin(&self, fail: bool) {
        self.fail_pin.store(fail, Ordering::SeqCst);
    }

    /// Make metadata updates fail with a 500.
    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    /// Number of pin requests received.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.pins.load(Ordering::SeqCst)
    }

    /// Number of metadata updates received.
    #[must_use]
    pub fn metadata_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.pin_count().saturating_add(self.metadata_count())
    }

    /// Documents pinned so far.
    #[must_use]
    pub fn pinned(&self) -> Vec<PinRequest> {
        self.pinned.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PinningApi for CountingPinningApi {
    async fn pin_json(&self, request: &PinRequest) -> BlobResult<ContentRef> {
        self.pins.fetch_add(1, Ordering::SeqCst);
        if self.fail_pin.load(Ordering::SeqCst) {
            return Err(BlobError::UploadFailed {
                status: 401,
                body: r#"{"error":"Invalid authentication credentials"}"#.to_string(),
            });
        }
        let content = serde_json::to_vec(&request.pinata_content)
            .map_err(|e| BlobError::Serialization(e.to_string()))?;
        if let Ok(mut guard) = self.pinned.lock() {
            guard.push(request.clone());
        }
        Ok(ContentRef::derived(&content))
    }

    async fn update_metadata(&self, _update: &MetadataUpdate) -> BlobResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(BlobError::UploadFailed {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_session::SessionManager;

    #[tokio::test]
    async fn test_mock_provider_counts_requests() {
        let provider = MockSessionProvider::new(MemoryLedger::new());
        let session = SessionManager::new(provider.clone());
        assert!(session.connect().await);
        assert!(session.connect().await);
        assert_eq!(provider.request_count(), 1);
        assert_eq!(session.current_address(), Some(test_account(1)));
    }

    #[tokio::test]
    async fn test_mock_provider_denies() {
        let provider = MockSessionProvider::new(MemoryLedger::new());
        provider.set_deny(true);
        let session = SessionManager::new(provider.clone());
        assert!(!session.connect().await);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_counting_api_derives_cids() {
        let api = CountingPinningApi::new();
        let request = PinRequest {
            pinata_content: serde_json::json!({"a": 1}),
            pinata_metadata: consent_blobstore::PinMetadata {
                name: "doc".to_string(),
            },
        };
        let first = api.pin_json(&request).await.unwrap();
        let second = api.pin_json(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.pin_count(), 2);
        assert_eq!(api.pinned().len(), 2);

        api.set_fail_pin(true);
        assert!(api.pin_json(&request).await.is_err());
        assert_eq!(api.pin_count(), 3);
    }
}
