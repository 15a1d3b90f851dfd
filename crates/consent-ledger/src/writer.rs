//! Ledger write path.

use chrono::Utc;
use consent_crypto::{Address, ContentRef, SubjectHandle};
use consent_session::{SessionManager, TransactionRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::abi::LedgerCall;
use crate::endpoint::LedgerEndpoint;
use crate::error::{LedgerError, LedgerResult};
use crate::types::{ActionType, LedgerRef, Origin, Receipt};

/// Default bound on the wait for a receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default receipt polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Submits consent actions to the contract through the session's signer.
pub struct LedgerWriter {
    endpoint: Arc<dyn LedgerEndpoint>,
    contract: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for LedgerWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerWriter")
            .field("contract", &self.contract)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

impl LedgerWriter {
    /// Create a writer for the contract at `contract`.
    #[must_use]
    pub fn new(endpoint: Arc<dyn LedgerEndpoint>, contract: Address) -> Self {
        Self {
            endpoint,
            contract,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how long to wait for a receipt.
    #[must_use]
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Set the receipt polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Contract this writer targets.
    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Record one action and wait for its confirmation.
    ///
    /// The signer is captured when the call starts; a disconnect while the
    /// transaction is in flight does not cancel it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoSession`] if no session is connected
    /// - [`LedgerError::ContractNotDeployed`] if there is no code at the
    ///   configured address
    /// - [`LedgerError::LedgerWriteFailed`] if submission, confirmation, or
    ///   execution fails, or the confirmation wait times out
    pub async fn write(
        &self,
        session: &SessionManager,
        subject: &SubjectHandle,
        counterparty: &str,
        action: &ActionType,
        content_ref: Option<&ContentRef>,
    ) -> LedgerResult<Receipt> {
        let signer = session.current_signer().ok_or(LedgerError::NoSession)?;

        match self.endpoint.code_exists(&self.contract).await {
            Ok(true) => {},
            Ok(false) => {
                return Err(LedgerError::ContractNotDeployed {
                    address: self.contract,
                });
            },
            Err(e) => {
                return Err(LedgerError::LedgerWriteFailed(format!(
                    "contract code lookup failed: {e}"
                )));
            },
        }

        let call = LedgerCall::for_action(*subject, counterparty, action, content_ref);
        let request = TransactionRequest {
            to: self.contract,
            data: call.encode()?,
        };
        let tx_id = signer
            .send_transaction(request)
            .await
            .map_err(|e| LedgerError::LedgerWriteFailed(format!("submission failed: {e}")))?;
        debug!(%tx_id, method = call.method(), from = %signer.address(), "Transaction submitted");

        let receipt = tokio::time::timeout(
            self.confirmation_timeout,
            self.endpoint.wait_for_receipt(&tx_id, self.poll_interval),
        )
        .await
        .map_err(|_| {
            LedgerError::LedgerWriteFailed(format!(
                "no confirmation for {tx_id} within {}s",
                self.confirmation_timeout.as_secs()
            ))
        })?
        .map_err(|e| LedgerError::LedgerWriteFailed(format!("confirmation failed: {e}")))?;

        if !receipt.success {
            return Err(LedgerError::LedgerWriteFailed(format!(
                "transaction {tx_id} reverted"
            )));
        }

        let log_index = receipt
            .logs
            .iter()
            .find(|log| log.address == self.contract)
            .map_or(0, |log| log.log_index);
        let recorded_at = match self.endpoint.block_timestamp(receipt.block_number).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!(error = %e, block = receipt.block_number, "Block timestamp unavailable");
                Utc::now()
            },
        };

        info!(
            %tx_id,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            action = %action,
            "Consent action recorded"
        );

        Ok(Receipt {
            ledger_ref: LedgerRef { tx_id, log_index },
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            recorded_at,
            origin: Origin::Ledger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use async_trait::async_trait;
    use consent_session::{
        ProviderNotification, SessionProvider, SessionResult, TransactionSigner,
    };
    use tokio::sync::broadcast;

    struct LedgerBackedProvider {
        ledger: MemoryLedger,
        notifications: broadcast::Sender<ProviderNotification>,
    }

    #[async_trait]
    impl SessionProvider for LedgerBackedProvider {
        async fn request_accounts(&self) -> SessionResult<Vec<Address>> {
            Ok(vec![Address::from_bytes([7; 20])])
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

    fn contract() -> Address {
        Address::from_bytes([0xc0; 20])
    }

    async fn connected(ledger: &MemoryLedger) -> Arc<SessionManager> {
        let (notifications, _) = broadcast::channel(4);
        let session = SessionManager::new(Arc::new(LedgerBackedProvider {
            ledger: ledger.clone(),
            notifications,
        }));
        assert!(session.connect().await);
        session
    }

    fn subject() -> SubjectHandle {
        SubjectHandle::hash("900101015678").unwrap()
    }

    #[tokio::test]
    async fn test_write_confirms() {
        let ledger = MemoryLedger::new();
        ledger.deploy(contract()).unwrap();
        let session = connected(&ledger).await;
        let writer = LedgerWriter::new(Arc::new(ledger.clone()), contract());

        let receipt = writer
            .write(
                &session,
                &subject(),
                "Bank Negara Malaysia",
                &ActionType::ConsentGranted,
                None,
            )
            .await
            .unwrap();
        assert_eq!(receipt.origin, Origin::Ledger);
        assert_eq!(receipt.block_number, 2);
        assert!(receipt.gas_used > 21_000);
        assert_eq!(receipt.tx_id().to_hex().len(), 66);
    }

    #[tokio::test]
    async fn test_write_without_session() {
        let ledger = MemoryLedger::new();
        ledger.deploy(contract()).unwrap();
        let (notifications, _) = broadcast::channel(4);
        let session = SessionManager::new(Arc::new(LedgerBackedProvider {
            ledger: ledger.clone(),
            notifications,
        }));
        let writer = LedgerWriter::new(Arc::new(ledger), contract());

        let err = writer
            .write(&session, &subject(), "Maybank", &ActionType::IdentityUsed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoSession));
    }

    #[tokio::test]
    async fn test_write_without_contract() {
        let ledger = MemoryLedger::new();
        let session = connected(&ledger).await;
        let writer = LedgerWriter::new(Arc::new(ledger.clone()), contract());

        let err = writer
            .write(&session, &subject(), "Maybank", &ActionType::IdentityUsed, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ContractNotDeployed { address } if address == contract()
        ));
        assert_eq!(ledger.log_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_times_out_waiting_for_receipt() {
        let ledger = MemoryLedger::new();
        ledger.deploy(contract()).unwrap();
        ledger.set_automine(false).unwrap();
        let session = connected(&ledger).await;
        let writer = LedgerWriter::new(Arc::new(ledger), contract())
            .with_confirmation_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(5));

        let err = writer
            .write(&session, &subject(), "Maybank", &ActionType::IdentityUsed, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::LedgerWriteFailed(ref msg) if msg.contains("no confirmation")
        ));
    }

    #[tokio::test]
    async fn test_disconnect_does_not_cancel_inflight_write() {
        let ledger = MemoryLedger::new();
        ledger.deploy(contract()).unwrap();
        ledger.set_automine(false).unwrap();
        let session = connected(&ledger).await;
        let writer = LedgerWriter::new(Arc::new(ledger.clone()), contract())
            .with_poll_interval(Duration::from_millis(5));

        let subject = subject();
        let (result, ()) = tokio::join!(
            writer.write(&session, &subject, "Maybank", &ActionType::IdentityUsed, None),
            async {
                while ledger.pending_count().unwrap() == 0 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                session.disconnect();
                assert_eq!(ledger.mine_pending().unwrap(), 1);
            }
        );

        assert!(!session.is_connected());
        let receipt = result.unwrap();
        assert_eq!(receipt.origin, Origin::Ledger);
        assert_eq!(ledger.log_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_fails_when_endpoint_offline() {
        let ledger = MemoryLedger::new();
        ledger.deploy(contract()).unwrap();
        let session = connected(&ledger).await;
        ledger.set_offline(true).unwrap();
        let writer = LedgerWriter::new(Arc::new(ledger), contract());

        let err = writer
            .write(&session, &subject(), "Maybank", &ActionType::IdentityUsed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::LedgerWriteFailed(_)));
    }
}
