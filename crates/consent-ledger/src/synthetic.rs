//! Fabricated audit trail served when the ledger is unavailable or empty.
//!
//! The dataset is deterministic per subject except for timestamps, which
//! are relative to the time of the call. Every event is marked
//! [`Origin::Synthetic`].

use chrono::{TimeDelta, Utc};
use consent_crypto::{ContentRef, SubjectHandle, TxId};

use crate::types::{ActionType, AuditEvent, LedgerRef, Origin};

/// Identifier whose handle stands in for "all subjects".
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// Approximate blocks per day at a 12 second block time.
const BLOCKS_PER_DAY: u64 = 7_200;

/// Lowest block number a synthetic dataset can start from.
const BASE_BLOCK: u64 = 5_000_000;

/// (action, counterparty, days before now). Newest first.
const TEMPLATE: [(ActionType, &str, u32); 6] = [
    (ActionType::ConsentGranted, "Bank Negara Malaysia", 1),
    (ActionType::IdentityUsed, "Maybank", 3),
    (ActionType::IdentityUsed, "Touch 'n Go eWallet", 6),
    (ActionType::ConsentRevoked, "CIMB Bank", 10),
    (ActionType::ConsentGranted, "Lembaga Hasil Dalam Negeri", 15),
    (ActionType::IdentityUsed, "KWSP", 21),
];

/// Handle used for synthetic data when no subject was given.
#[must_use]
pub fn anonymous_subject() -> SubjectHandle {
    match SubjectHandle::hash(ANONYMOUS_IDENTIFIER) {
        Ok(handle) => handle,
        // The identifier is a non-empty constant.
        Err(_) => SubjectHandle::from_bytes([0; 32]),
    }
}

/// The synthetic audit trail for `subject`, sorted newest first.
///
/// Six events spanning all three categories.
#[must_use]
pub fn dataset(subject: &SubjectHandle) -> Vec<AuditEvent> {
    let now = Utc::now();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&subject.as_bytes()[..8]);
    let offset = u64::from_be_bytes(seed).checked_rem(1_000_000).unwrap_or(0);
    let head = BASE_BLOCK.saturating_add(offset);

    TEMPLATE
        .iter()
        .zip(0u32..)
        .map(|((action, counterparty, days_ago), index)| {
            let index_bytes = index.to_be_bytes();
            AuditEvent {
                subject: *subject,
                action: action.clone(),
                counterparty: (*counterparty).to_string(),
                content_ref: Some(ContentRef::derived(
                    &[subject.as_bytes().as_slice(), &index_bytes].concat(),
                )),
                occurred_at: now
                    .checked_sub_signed(TimeDelta::days(i64::from(*days_ago)))
                    .unwrap_or(now),
                block_number: head
                    .saturating_sub(u64::from(*days_ago).saturating_mul(BLOCKS_PER_DAY)),
                ledger_ref: LedgerRef {
                    tx_id: TxId::derive(&[b"synthetic", subject.as_bytes(), &index_bytes]),
                    log_index: 0,
                },
                origin: Origin::Synthetic,
            }
        })
        .collect()
}
