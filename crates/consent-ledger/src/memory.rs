//! In-process ledger.
//!
//! Mines one block per transaction, serves reads through
//! [`LedgerEndpoint`], and hands out [`TransactionSigner`]s that submit to it.
//! Used by the CLI's offline mode and by tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use consent_crypto::{Address, TxId};
use consent_session::{SessionError, SessionResult, TransactionRequest, TransactionSigner};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::abi::{LedgerCall, RawLog};
use crate::endpoint::{LedgerEndpoint, LogFilter, TxReceipt};
use crate::error::{LedgerError, LedgerResult};

/// Base cost of every transaction.
pub const BASE_GAS: u64 = 21_000;
/// Cost per byte of calldata.
pub const GAS_PER_BYTE: u64 = 16;
/// Seconds between consecutive blocks.
pub const BLOCK_INTERVAL_SECS: i64 = 12;

#[derive(Debug)]
struct LedgerState {
    genesis: DateTime<Utc>,
    head: u64,
    nonce: u64,
    contracts: HashSet<Address>,
    receipts: HashMap<TxId, TxReceipt>,
    logs: Vec<RawLog>,
    offline: bool,
    automine: bool,
    pending: Vec<TxId>,
}

impl LedgerState {
    fn timestamp(&self, number: u64) -> DateTime<Utc> {
        let offset = i64::try_from(number)
            .unwrap_or(i64::MAX)
            .saturating_mul(BLOCK_INTERVAL_SECS);
        self.genesis
            .checked_add_signed(TimeDelta::seconds(offset))
            .unwrap_or(self.genesis)
    }

    fn next_tx_id(&mut self, from: &Address) -> TxId {
        self.nonce = self.nonce.saturating_add(1);
        TxId::derive(&[b"memory-ledger", from.as_bytes(), &self.nonce.to_be_bytes()])
    }

    fn mine(&mut self) -> u64 {
        self.head = self.head.saturating_add(1);
        self.head
    }
}

/// A shared in-memory ledger. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create a ledger holding only the genesis block.
    #[must_use]
    pub fn new() -> Self {
        let genesis = Utc::now()
            .checked_sub_signed(TimeDelta::days(30))
            .unwrap_or_else(Utc::now);
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                genesis,
                head: 0,
                nonce: 0,
                contracts: HashSet::new(),
                receipts: HashMap::new(),
                logs: Vec::new(),
                offline: false,
                automine: true,
                pending: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Rpc("ledger state poisoned".to_string()))
    }

    fn lock_online(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        let state = self.lock()?;
        if state.offline {
            return Err(LedgerError::Rpc("endpoint unreachable".to_string()));
        }
        Ok(state)
    }

    /// Deploy the consent contract at `address`, returning the deployment
    /// transaction id.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger is offline.
    pub fn deploy(&self, address: Address) -> LedgerResult<TxId> {
        let mut state = self.lock_online()?;
        let tx_id = state.next_tx_id(&address);
        let block_number = state.mine();
        state.contracts.insert(address);
        state.receipts.insert(
            tx_id,
            TxReceipt {
                tx_id,
                block_number,
                gas_used: BASE_GAS,
                success: true,
                logs: Vec::new(),
            },
        );
        debug!(contract = %address, block_number, "Contract deployed");
        Ok(tx_id)
    }

    /// Mine `count` empty blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn advance(&self, count: u64) -> LedgerResult<u64> {
        let mut state = self.lock()?;
        state.head = state.head.saturating_add(count);
        Ok(state.head)
    }

    /// Make every read and submission fail until switched back.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn set_offline(&self, offline: bool) -> LedgerResult<()> {
        self.lock()?.offline = offline;
        Ok(())
    }

    /// When disabled, submissions stay pending until [`Self::mine_pending`].
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn set_automine(&self, automine: bool) -> LedgerResult<()> {
        self.lock()?.automine = automine;
        Ok(())
    }

    /// Number of submitted transactions not yet mined.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn pending_count(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.pending.len())
    }

    /// Mine every pending transaction into one block.
    ///
    /// Returns how many were mined.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn mine_pending(&self) -> LedgerResult<usize> {
        let mut state = self.lock()?;
        let pending = std::mem::take(&mut state.pending);
        if pending.is_empty() {
            return Ok(0);
        }
        let block_number = state.mine();
        for (index, tx_id) in pending.iter().enumerate() {
            if let Some(mut receipt) = state.receipts.remove(tx_id) {
                receipt.block_number = block_number;
                for log in &mut receipt.logs {
                    log.block_number = block_number;
                    log.log_index = u32::try_from(index).unwrap_or(u32::MAX);
                }
                state.logs.extend(receipt.logs.iter().cloned());
                state.receipts.insert(*tx_id, receipt);
            }
        }
        Ok(pending.len())
    }

    /// Append a log as-is in a fresh block, bypassing calldata validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn inject_log(&self, mut log: RawLog) -> LedgerResult<u64> {
        let mut state = self.lock()?;
        let block_number = state.mine();
        log.block_number = block_number;
        state.logs.push(log);
        Ok(block_number)
    }

    /// Number of logs stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger state is poisoned.
    pub fn log_count(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.logs.len())
    }

    /// A signer that submits from `address`.
    #[must_use]
    pub fn signer(&self, address: Address) -> Arc<dyn TransactionSigner> {
        Arc::new(MemorySigner {
            ledger: self.clone(),
            address,
        })
    }

    /// Execute a transaction.
    ///
    /// Calls to an address without code revert. Valid calls emit one log.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger is offline or the calldata is not a
    /// known call.
    pub fn submit(&self, from: &Address, request: &TransactionRequest) -> LedgerResult<TxId> {
        let call = LedgerCall::decode(&request.data)?;
        let mut state = self.lock_online()?;
        let tx_id = state.next_tx_id(from);
        let gas_used = u64::try_from(request.data.len())
            .unwrap_or(u64::MAX)
            .saturating_mul(GAS_PER_BYTE)
            .saturating_add(BASE_GAS);

        let success = state.contracts.contains(&request.to);
        let logs = if success {
            let (_, topics, data) = call.emitted_log()?;
            vec![RawLog {
                address: request.to,
                topics,
                data,
                block_number: 0,
                tx_id,
                log_index: 0,
            }]
        } else {
            Vec::new()
        };

        let mut receipt = TxReceipt {
            tx_id,
            block_number: 0,
            gas_used,
            success,
            logs,
        };

        if state.automine {
            let block_number = state.mine();
            receipt.block_number = block_number;
            for log in &mut receipt.logs {
                log.block_number = block_number;
            }
            state.logs.extend(receipt.logs.iter().cloned());
            state.receipts.insert(tx_id, receipt);
        } else {
            // Readers see `None` until mined.
            state.pending.push(tx_id);
            state.receipts.insert(tx_id, receipt);
        }

        debug!(%tx_id, method = call.method(), success, "Transaction submitted");
        Ok(tx_id)
    }
}

#[async_trait]
impl LedgerEndpoint for MemoryLedger {
    async fn code_exists(&self, address: &Address) -> LedgerResult<bool> {
        Ok(self.lock_online()?.contracts.contains(address))
    }

    async fn latest_block(&self) -> LedgerResult<u64> {
        Ok(self.lock_online()?.head)
    }

    async fn block_timestamp(&self, number: u64) -> LedgerResult<DateTime<Utc>> {
        let state = self.lock_online()?;
        if number > state.head {
            return Err(LedgerError::Rpc(format!("unknown block {number}")));
        }
        Ok(state.timestamp(number))
    }

    async fn transaction_receipt(&self, tx_id: &TxId) -> LedgerResult<Option<TxReceipt>> {
        let state = self.lock_online()?;
        if state.pending.contains(tx_id) {
            return Ok(None);
        }
        Ok(state.receipts.get(tx_id).cloned())
    }

    async fn logs(&self, filter: &LogFilter) -> LedgerResult<Vec<RawLog>> {
        let state = self.lock_online()?;
        Ok(state
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }
}

/// Signer bound to one account on a [`MemoryLedger`].
#[derive(Debug)]
struct MemorySigner {
    ledger: MemoryLedger,
    address: Address,
}

#[async_trait]
impl TransactionSigner for MemorySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, request: TransactionRequest) -> SessionResult<TxId> {
        self.ledger
            .submit(&self.address, &request)
            .map_err(|e| SessionError::Provider(e.to_string()))
    }
}
