//! Read-side interface to a ledger node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use consent_crypto::{Address, SubjectHandle, TxId};
use std::time::Duration;

use crate::abi::{EventCategory, RawLog};
use crate::error::LedgerResult;

/// Filter for a single-category log scan over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract.
    pub address: Address,
    /// Required first topic.
    pub topic0: [u8; 32],
    /// Required second topic, if filtering by subject.
    pub topic1: Option<[u8; 32]>,
    /// First block scanned.
    pub from_block: u64,
    /// Last block scanned.
    pub to_block: u64,
}

impl LogFilter {
    /// Scan one category over `from_block..=to_block`.
    #[must_use]
    pub fn new(address: Address, category: EventCategory, from_block: u64, to_block: u64) -> Self {
        Self {
            address,
            topic0: category.topic(),
            topic1: None,
            from_block,
            to_block,
        }
    }

    /// Restrict the scan to one subject.
    #[must_use]
    pub fn with_subject(mut self, subject: &SubjectHandle) -> Self {
        self.topic1 = Some(*subject.as_bytes());
        self
    }

    /// Whether a log passes this filter.
    #[must_use]
    pub fn matches(&self, log: &RawLog) -> bool {
        log.address == self.address
            && (self.from_block..=self.to_block).contains(&log.block_number)
            && log.topics.first() == Some(&self.topic0)
            && self
                .topic1
                .is_none_or(|subject| log.topics.get(1) == Some(&subject))
    }
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction id.
    pub tx_id: TxId,
    /// Block the transaction landed in.
    pub block_number: u64,
    /// Gas consumed.
    pub gas_used: u64,
    /// `false` if the transaction reverted.
    pub success: bool,
    /// Logs emitted by the transaction.
    pub logs: Vec<RawLog>,
}

/// Read access to a ledger node.
#[async_trait]
pub trait LedgerEndpoint: Send + Sync {
    /// Whether contract code exists at an address.
    async fn code_exists(&self, address: &Address) -> LedgerResult<bool>;

    /// Number of the newest block.
    async fn latest_block(&self) -> LedgerResult<u64>;

    /// Timestamp of a block.
    async fn block_timestamp(&self, number: u64) -> LedgerResult<DateTime<Utc>>;

    /// Receipt of a transaction, `None` while it is still pending or unknown.
    async fn transaction_receipt(&self, tx_id: &TxId) -> LedgerResult<Option<TxReceipt>>;

    /// Logs matching a filter.
    async fn logs(&self, filter: &LogFilter) -> LedgerResult<Vec<RawLog>>;

    /// Poll until a receipt is available.
    ///
    /// Never gives up on its own; callers bound it with a timeout.
    async fn wait_for_receipt(
        &self,
        tx_id: &TxId,
        poll_interval: Duration,
    ) -> LedgerResult<TxReceipt> {
        loop {
            if let Some(receipt) = self.transaction_receipt(tx_id).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
