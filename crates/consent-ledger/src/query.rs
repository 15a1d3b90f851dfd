//! Event aggregation across the three contract event streams.

use chrono::{DateTime, Utc};
use consent_crypto::{Address, SubjectHandle, TxId};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::abi::{DecodedLog, EventCategory, decode_log};
use crate::endpoint::{LedgerEndpoint, LogFilter};
use crate::error::{LedgerError, LedgerResult};
use crate::synthetic;
use crate::types::{AuditEvent, Origin};

/// Whether to substitute the synthetic dataset when a query fails or finds
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntheticFallback {
    /// Serve synthetic data (demo behaviour).
    #[default]
    Enabled,
    /// Surface errors and empty results as they are.
    Disabled,
}

impl From<bool> for SyntheticFallback {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

/// Where and how to scan.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Consent contract.
    pub contract: Address,
    /// Deployment transaction; its block becomes the scan floor.
    pub deployment_tx: Option<TxId>,
    /// Scan floor when the deployment block is unknown.
    pub fallback_scan_floor: u64,
    /// Fallback policy.
    pub synthetic_fallback: SyntheticFallback,
}

impl QueryConfig {
    /// Scan `contract` from block 0 with synthetic fallback enabled.
    #[must_use]
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            deployment_tx: None,
            fallback_scan_floor: 0,
            synthetic_fallback: SyntheticFallback::Enabled,
        }
    }

    /// Set the deployment transaction.
    #[must_use]
    pub fn with_deployment_tx(mut self, tx_id: TxId) -> Self {
        self.deployment_tx = Some(tx_id);
        self
    }

    /// Set the fallback policy.
    #[must_use]
    pub fn with_synthetic_fallback(mut self, fallback: SyntheticFallback) -> Self {
        self.synthetic_fallback = fallback;
        self
    }
}

/// Reads and merges consent events for a subject or for everyone.
pub struct EventQuery {
    endpoint: Arc<dyn LedgerEndpoint>,
    config: QueryConfig,
    scan_floor: OnceLock<u64>,
}

impl std::fmt::Debug for EventQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQuery")
            .field("config", &self.config)
            .field("scan_floor", &self.scan_floor.get())
            .finish_non_exhaustive()
    }
}

impl EventQuery {
    /// Create a query over `endpoint`.
    #[must_use]
    pub fn new(endpoint: Arc<dyn LedgerEndpoint>, config: QueryConfig) -> Self {
        Self {
            endpoint,
            config,
            scan_floor: OnceLock::new(),
        }
    }

    /// Events for `subject` (or all subjects), newest first.
    ///
    /// A subject-filtered scan that finds nothing is retried without the
    /// subject filter and those results are returned as they are. When the
    /// result is still empty, or any read fails, the synthetic dataset is
    /// returned instead if the fallback is enabled.
    ///
    /// # Errors
    ///
    /// Only when the fallback is disabled: the first endpoint or decode
    /// error encountered.
    pub async fn query(&self, subject: Option<&SubjectHandle>) -> LedgerResult<Vec<AuditEvent>> {
        let fallback = self.config.synthetic_fallback == SyntheticFallback::Enabled;
        match self.scan(subject).await {
            Ok(events) if !events.is_empty() => Ok(events),
            Ok(events) => {
                if fallback {
                    info!("ledger has no matching events, serving synthetic dataset");
                    Ok(self.synthetic(subject))
                } else {
                    Ok(events)
                }
            },
            Err(e) if fallback => {
                warn!(error = %e, "ledger query failed, serving synthetic dataset");
                Ok(self.synthetic(subject))
            },
            Err(e) => Err(e),
        }
    }

    /// Hash `identifier` and query its events.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidInput`] if the identifier cannot be hashed,
    /// otherwise as [`Self::query`].
    pub async fn query_identifier(&self, identifier: &str) -> LedgerResult<Vec<AuditEvent>> {
        let subject = SubjectHandle::hash(identifier)
            .map_err(|e| LedgerError::InvalidInput(e.to_string()))?;
        self.query(Some(&subject)).await
    }

    fn synthetic(&self, subject: Option<&SubjectHandle>) -> Vec<AuditEvent> {
        let handle = subject.copied().unwrap_or_else(synthetic::anonymous_subject);
        synthetic::dataset(&handle)
    }

    /// Block the scan starts from.
    ///
    /// Resolved once from the deployment transaction's receipt. Lookup
    /// failures fall back to the configured floor and are retried on the
    /// next call.
    pub async fn scan_floor(&self) -> u64 {
        if let Some(floor) = self.scan_floor.get() {
            return *floor;
        }
        let fallback = self.config.fallback_scan_floor;
        let Some(tx_id) = self.config.deployment_tx else {
            return *self.scan_floor.get_or_init(|| fallback);
        };

        match self.endpoint.transaction_receipt(&tx_id).await {
            Ok(Some(receipt)) => {
                debug!(block = receipt.block_number, "scan floor resolved from deployment");
                *self.scan_floor.get_or_init(|| receipt.block_number)
            },
            Ok(None) => {
                warn!(%tx_id, "deployment transaction not found, using fallback scan floor");
                fallback
            },
            Err(e) => {
                warn!(%tx_id, error = %e, "deployment lookup failed, using fallback scan floor");
                fallback
            },
        }
    }

    async fn scan(&self, subject: Option<&SubjectHandle>) -> LedgerResult<Vec<AuditEvent>> {
        let from = self.scan_floor().await;
        let to = self.endpoint.latest_block().await?;

        if let Some(subject) = subject {
            let events = self.scan_range(Some(subject), from, to).await?;
            if !events.is_empty() {
                return Ok(events);
            }
            debug!(%subject, "no events for subject, retrying unfiltered");
        }
        self.scan_range(None, from, to).await
    }

    async fn scan_range(
        &self,
        subject: Option<&SubjectHandle>,
        from: u64,
        to: u64,
    ) -> LedgerResult<Vec<AuditEvent>> {
        if from > to {
            return Ok(Vec::new());
        }
        let filter = |category| {
            let filter = LogFilter::new(self.config.contract, category, from, to);
            match subject {
                Some(subject) => filter.with_subject(subject),
                None => filter,
            }
        };
        let usage = filter(EventCategory::Usage);
        let granted = filter(EventCategory::Granted);
        let revoked = filter(EventCategory::Revoked);

        let (usage, granted, revoked) = tokio::try_join!(
            self.endpoint.logs(&usage),
            self.endpoint.logs(&granted),
            self.endpoint.logs(&revoked),
        )?;
        debug!(
            usage = usage.len(),
            granted = granted.len(),
            revoked = revoked.len(),
            from,
            to,
            "logs fetched"
        );

        let decoded = usage
            .iter()
            .chain(&granted)
            .chain(&revoked)
            .map(decode_log)
            .collect::<LedgerResult<Vec<_>>>()?;
        let timestamps = self.block_timestamps(&decoded).await?;

        let events = decoded
            .into_iter()
            .filter_map(|log| {
                let occurred_at = *timestamps.get(&log.block_number)?;
                Some(into_event(log, occurred_at))
            })
            .collect();
        Ok(normalize(events))
    }

    async fn block_timestamps(
        &self,
        logs: &[DecodedLog],
    ) -> LedgerResult<HashMap<u64, DateTime<Utc>>> {
        let blocks: HashSet<u64> = logs.iter().map(|log| log.block_number).collect();
        let resolved = try_join_all(blocks.into_iter().map(|number| async move {
            self.endpoint
                .block_timestamp(number)
                .await
                .map(|ts| (number, ts))
        }))
        .await?;
        Ok(resolved.into_iter().collect())
    }
}

fn into_event(log: DecodedLog, occurred_at: DateTime<Utc>) -> AuditEvent {
    AuditEvent {
        subject: log.subject,
        action: log.action,
        counterparty: log.counterparty,
        content_ref: log.content_ref,
        occurred_at,
        block_number: log.block_number,
        ledger_ref: log.ledger_ref,
        origin: Origin::Ledger,
    }
}

/// Drop duplicate ledger positions and sort newest first.
#[must_use]
pub fn normalize(mut events: Vec<AuditEvent>) -> Vec<AuditEvent> {
    let mut seen = HashSet::new();
    events.retain(|event| seen.insert(event.ledger_ref));
    events.sort_by(|a, b| {
        b.position()
            .cmp(&a.position())
            .then_with(|| b.ledger_ref.tx_id.cmp(&a.ledger_ref.tx_id))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{LedgerCall, RawLog};
    use crate::memory::MemoryLedger;
    use crate::types::ActionType;
    use consent_session::TransactionRequest;

    fn contract() -> Address {
        Address::from_bytes([0xc0; 20])
    }

    fn subject(id: &str) -> SubjectHandle {
        SubjectHandle::hash(id).unwrap()
    }

    fn record(
        ledger: &MemoryLedger,
        subject: SubjectHandle,
        action: ActionType,
        counterparty: &str,
    ) {
        let call = LedgerCall::for_action(subject, counterparty, &action, None);
        let request = TransactionRequest {
            to: contract(),
            data: call.encode().unwrap(),
        };
        ledger.submit(&Address::default(), &request).unwrap();
    }

    fn deployed() -> (MemoryLedger, QueryConfig) {
        let ledger = MemoryLedger::new();
        let deploy_tx = ledger.deploy(contract()).unwrap();
        let config = QueryConfig::new(contract()).with_deployment_tx(deploy_tx);
        (ledger, config)
    }

    #[tokio::test]
    async fn test_merges_categories_newest_first() {
        let (ledger, config) = deployed();
        let alice = subject("900101015678");
        record(&ledger, alice, ActionType::ConsentGranted, "Maybank");
        record(&ledger, alice, ActionType::IdentityUsed, "Maybank");
        record(&ledger, alice, ActionType::ConsentRevoked, "Maybank");

        let query = EventQuery::new(Arc::new(ledger), config);
        let events = query.query(Some(&alice)).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.origin == Origin::Ledger));
        assert_eq!(events[0].action, ActionType::ConsentRevoked);
        assert_eq!(events[1].action, ActionType::IdentityUsed);
        assert_eq!(events[2].action, ActionType::ConsentGranted);
        for pair in events.windows(2) {
            assert!(pair[0].position() > pair[1].position());
            assert!(pair[0].occurred_at > pair[1].occurred_at);
        }
    }

    #[tokio::test]
    async fn test_filters_by_subject() {
        let (ledger, config) = deployed();
        let alice = subject("900101015678");
        let bob = subject("880202025555");
        record(&ledger, alice, ActionType::ConsentGranted, "Maybank");
        record(&ledger, bob, ActionType::ConsentGranted, "CIMB Bank");

        let query = EventQuery::new(Arc::new(ledger), config);
        let events = query.query(Some(&bob)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, bob);
        assert_eq!(events[0].counterparty, "CIMB Bank");
    }

    #[tokio::test]
    async fn test_unknown_subject_falls_back_to_global_scan() {
        let (ledger, config) = deployed();
        let alice = subject("900101015678");
        record(&ledger, alice, ActionType::IdentityUsed, "Maybank");

        let query = EventQuery::new(Arc::new(ledger), config);
        let events = query.query(Some(&subject("000000000000"))).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, alice);
        assert_eq!(events[0].origin, Origin::Ledger);
    }

    #[tokio::test]
    async fn test_empty_ledger_serves_synthetic() {
        let (ledger, config) = deployed();
        let query = EventQuery::new(Arc::new(ledger), config);
        let events = query.query(None).await.unwrap();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.origin == Origin::Synthetic));
        assert!(events.iter().all(|e| e.subject == synthetic::anonymous_subject()));
    }

    #[tokio::test]
    async fn test_query_identifier() {
        let (ledger, config) = deployed();
        let query = EventQuery::new(Arc::new(ledger), config);

        let events = query.query_identifier("900101015678").await.unwrap();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.subject == subject("900101015678")));
        assert!(matches!(
            query.query_identifier("  ").await,
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_ledger_without_fallback() {
        let (ledger, config) = deployed();
        let query = EventQuery::new(
            Arc::new(ledger),
            config.with_synthetic_fallback(SyntheticFallback::Disabled),
        );
        assert!(query.query(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_ledger() {
        let (ledger, config) = deployed();
        ledger.set_offline(true).unwrap();
        let alice = subject("900101015678");

        let query = EventQuery::new(Arc::new(ledger.clone()), config.clone());
        let events = query.query(Some(&alice)).await.unwrap();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.subject == alice && e.origin.is_synthetic()));

        let strict = EventQuery::new(
            Arc::new(ledger),
            config.with_synthetic_fallback(SyntheticFallback::Disabled),
        );
        assert!(strict.query(Some(&alice)).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_log_fails_whole_query() {
        let (ledger, config) = deployed();
        record(&ledger, subject("900101015678"), ActionType::IdentityUsed, "Maybank");
        ledger
            .inject_log(RawLog {
                address: contract(),
                topics: vec![EventCategory::Usage.topic(), [1; 32]],
                data: b"{\"counterparty\":\"Maybank\"}".to_vec(),
                block_number: 0,
                tx_id: TxId::derive(&[b"bad"]),
                log_index: 0,
            })
            .unwrap();

        let strict = EventQuery::new(
            Arc::new(ledger),
            config.with_synthetic_fallback(SyntheticFallback::Disabled),
        );
        assert!(strict.query(None).await.is_err());
    }

    #[tokio::test]
    async fn test_scan_floor_resolved_once() {
        let ledger = MemoryLedger::new();
        ledger.advance(10).unwrap();
        let deploy_tx = ledger.deploy(contract()).unwrap();
        let query = EventQuery::new(
            Arc::new(ledger.clone()),
            QueryConfig::new(contract()).with_deployment_tx(deploy_tx),
        );
        assert_eq!(query.scan_floor().await, 11);

        // Cached: later outages do not affect it.
        ledger.set_offline(true).unwrap();
        assert_eq!(query.scan_floor().await, 11);
    }

    #[tokio::test]
    async fn test_scan_floor_lookup_failure_not_cached() {
        let ledger = MemoryLedger::new();
        let deploy_tx = ledger.deploy(contract()).unwrap();
        ledger.advance(4).unwrap();
        ledger.set_offline(true).unwrap();

        let mut config = QueryConfig::new(contract()).with_deployment_tx(deploy_tx);
        config.fallback_scan_floor = 3;
        let query = EventQuery::new(Arc::new(ledger.clone()), config);
        assert_eq!(query.scan_floor().await, 3);

        ledger.set_offline(false).unwrap();
        assert_eq!(query.scan_floor().await, 1);
    }

    fn events_at(logs: &[RawLog], at: DateTime<Utc>) -> Vec<AuditEvent> {
        logs.iter()
            .map(|log| into_event(decode_log(log).unwrap(), at))
            .collect()
    }

    #[test]
    fn test_normalize_dedups_and_sorts() {
        let alice = subject("900101015678");
        let call = LedgerCall::for_action(alice, "Maybank", &ActionType::IdentityUsed, None);
        let (_, topics, data) = call.emitted_log().unwrap();
        let log = |block: u64, index: u32, tag: &[u8]| RawLog {
            address: contract(),
            topics: topics.clone(),
            data: data.clone(),
            block_number: block,
            tx_id: TxId::derive(&[tag]),
            log_index: index,
        };
        let logs = vec![log(5, 0, b"a"), log(9, 1, b"b"), log(9, 3, b"c"), log(5, 0, b"a")];

        let events = normalize(events_at(&logs, Utc::now()));
        let positions: Vec<_> = events.iter().map(AuditEvent::position).collect();
        assert_eq!(positions, vec![(9, 3), (9, 1), (5, 0)]);
    }
}
