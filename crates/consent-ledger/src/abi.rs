//! Contract call and event schema.
//!
//! Calldata is a JSON-encoded [`LedgerCall`] tagged by method name. Each
//! emitted log carries two topics: the category id (BLAKE3 of the event
//! signature) and the subject handle. The log data is a JSON payload whose
//! shape depends on the category; unknown fields are rejected.

use consent_crypto::{Address, ContentRef, SubjectHandle, TxId};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{ActionType, LedgerRef};

/// The three event streams the consent contract emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// `IdentityUsed(bytes32,string,string,string)`
    Usage,
    /// `ConsentGranted(bytes32,string,string)`
    Granted,
    /// `ConsentRevoked(bytes32,string,string)`
    Revoked,
}

impl EventCategory {
    /// Every category, in scan order.
    pub const ALL: [Self; 3] = [Self::Usage, Self::Granted, Self::Revoked];

    /// Event signature string.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Usage => "IdentityUsed(bytes32,string,string,string)",
            Self::Granted => "ConsentGranted(bytes32,string,string)",
            Self::Revoked => "ConsentRevoked(bytes32,string,string)",
        }
    }

    /// First log topic identifying this category.
    #[must_use]
    pub fn topic(self) -> [u8; 32] {
        static TOPICS: OnceLock<[[u8; 32]; 3]> = OnceLock::new();
        let topics = TOPICS.get_or_init(|| {
            Self::ALL.map(|category| *blake3::hash(category.signature().as_bytes()).as_bytes())
        });
        topics[self.index()]
    }

    /// Look up the category for a first log topic.
    #[must_use]
    pub fn from_topic(topic: &[u8; 32]) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.topic() == *topic)
    }

    const fn index(self) -> usize {
        match self {
            Self::Usage => 0,
            Self::Granted => 1,
            Self::Revoked => 2,
        }
    }
}

/// A contract invocation, encoded as transaction calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum LedgerCall {
    /// `grantConsent(subject, counterparty, contentRef)`
    GrantConsent {
        /// Subject handle.
        subject: SubjectHandle,
        /// Counterparty name.
        counterparty: String,
        /// Attached document.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_ref: Option<ContentRef>,
    },
    /// `revokeConsent(subject, counterparty, contentRef)`
    RevokeConsent {
        /// Subject handle.
        subject: SubjectHandle,
        /// Counterparty name.
        counterparty: String,
        /// Attached document.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_ref: Option<ContentRef>,
    },
    /// `logIdentityUsage(subject, counterparty, action, contentRef)`
    LogIdentityUsage {
        /// Subject handle.
        subject: SubjectHandle,
        /// Counterparty name.
        counterparty: String,
        /// Action label.
        action: String,
        /// Attached document.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_ref: Option<ContentRef>,
    },
}

impl LedgerCall {
    /// Choose the entry point for an action.
    #[must_use]
    pub fn for_action(
        subject: SubjectHandle,
        counterparty: &str,
        action: &ActionType,
        content_ref: Option<&ContentRef>,
    ) -> Self {
        let counterparty = counterparty.to_string();
        let content_ref = content_ref.cloned();
        match action {
            ActionType::ConsentGranted => Self::GrantConsent {
                subject,
                counterparty,
                content_ref,
            },
            ActionType::ConsentRevoked => Self::RevokeConsent {
                subject,
                counterparty,
                content_ref,
            },
            ActionType::IdentityUsed | ActionType::Custom(_) => Self::LogIdentityUsage {
                subject,
                counterparty,
                action: action.as_str().to_string(),
                content_ref,
            },
        }
    }

    /// Method name on the contract.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::GrantConsent { .. } => "grantConsent",
            Self::RevokeConsent { .. } => "revokeConsent",
            Self::LogIdentityUsage { .. } => "logIdentityUsage",
        }
    }

    /// Subject the call concerns.
    #[must_use]
    pub const fn subject(&self) -> &SubjectHandle {
        match self {
            Self::GrantConsent { subject, .. }
            | Self::RevokeConsent { subject, .. }
            | Self::LogIdentityUsage { subject, .. } => subject,
        }
    }

    /// Encode as calldata.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] if encoding fails.
    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Decode from calldata.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Decode`] if the bytes are not a known call.
    pub fn decode(data: &[u8]) -> LedgerResult<Self> {
        serde_json::from_slice(data).map_err(|e| LedgerError::Decode(format!("calldata: {e}")))
    }

    /// The category, topics, and data of the log this call emits.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] if the payload cannot be encoded.
    pub fn emitted_log(&self) -> LedgerResult<(EventCategory, Vec<[u8; 32]>, Vec<u8>)> {
        let (category, data) = match self {
            Self::GrantConsent {
                counterparty,
                content_ref,
                ..
            } => (
                EventCategory::Granted,
                serde_json::to_vec(&ConsentPayload {
                    counterparty: counterparty.clone(),
                    content_ref: content_ref.clone(),
                }),
            ),
            Self::RevokeConsent {
                counterparty,
                content_ref,
                ..
            } => (
                EventCategory::Revoked,
                serde_json::to_vec(&ConsentPayload {
                    counterparty: counterparty.clone(),
                    content_ref: content_ref.clone(),
                }),
            ),
            Self::LogIdentityUsage {
                counterparty,
                action,
                content_ref,
                ..
            } => (
                EventCategory::Usage,
                serde_json::to_vec(&UsagePayload {
                    counterparty: counterparty.clone(),
                    action: action.clone(),
                    content_ref: content_ref.clone(),
                }),
            ),
        };
        let data = data.map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let topics = vec![category.topic(), *self.subject().as_bytes()];
        Ok((category, topics, data))
    }
}

/// Log data of a usage event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UsagePayload {
    /// Counterparty name.
    pub counterparty: String,
    /// Action label.
    pub action: String,
    /// Attached document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<ContentRef>,
}

/// Log data of a grant or revoke event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsentPayload {
    /// Counterparty name.
    pub counterparty: String,
    /// Attached document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<ContentRef>,
}

/// A raw log as returned by a ledger endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics. `topics[0]` is the category, `topics[1]` the subject.
    pub topics: Vec<[u8; 32]>,
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Containing block.
    pub block_number: u64,
    /// Emitting transaction.
    pub tx_id: TxId,
    /// Index of the log within its block.
    pub log_index: u32,
}

/// A log decoded against its category schema, before timestamp resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// Event stream the log belongs to.
    pub category: EventCategory,
    /// Subject from the second topic.
    pub subject: SubjectHandle,
    /// Action; fixed for grant/revoke, carried in the payload for usage.
    pub action: ActionType,
    /// Counterparty name.
    pub counterparty: String,
    /// Attached document.
    pub content_ref: Option<ContentRef>,
    /// Containing block.
    pub block_number: u64,
    /// Transaction and log position.
    pub ledger_ref: LedgerRef,
}

/// Decode a raw log into its typed fields.
///
/// # Errors
///
/// Returns [`LedgerError::Decode`] if the topics are missing or unknown, or
/// the payload does not match the category schema.
pub fn decode_log(log: &RawLog) -> LedgerResult<DecodedLog> {
    let [topic0, topic1, ..] = log.topics.as_slice() else {
        return Err(LedgerError::Decode(format!(
            "log {}:{} has {} topics, expected at least 2",
            log.tx_id,
            log.log_index,
            log.topics.len()
        )));
    };
    let category = EventCategory::from_topic(topic0).ok_or_else(|| {
        LedgerError::Decode(format!("log {}:{} has unknown topic", log.tx_id, log.log_index))
    })?;

    let payload_err =
        |e: serde_json::Error| LedgerError::Decode(format!("{category:?} payload: {e}"));
    let (action, counterparty, content_ref) = match category {
        EventCategory::Usage => {
            let p: UsagePayload = serde_json::from_slice(&log.data).map_err(payload_err)?;
            (ActionType::parse(&p.action), p.counterparty, p.content_ref)
        },
        EventCategory::Granted => {
            let p: ConsentPayload = serde_json::from_slice(&log.data).map_err(payload_err)?;
            (ActionType::ConsentGranted, p.counterparty, p.content_ref)
        },
        EventCategory::Revoked => {
            let p: ConsentPayload = serde_json::from_slice(&log.data).map_err(payload_err)?;
            (ActionType::ConsentRevoked, p.counterparty, p.content_ref)
        },
    };

    Ok(DecodedLog {
        category,
        subject: SubjectHandle::from_bytes(*topic1),
        action,
        counterparty,
        content_ref,
        block_number: log.block_number,
        ledger_ref: LedgerRef {
            tx_id: log.tx_id,
            log_index: log.log_index,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectHandle {
        SubjectHandle::hash("900101015678").unwrap()
    }

    fn raw(topics: Vec<[u8; 32]>, data: &[u8]) -> RawLog {
        RawLog {
            address: Address::default(),
            topics,
            data: data.to_vec(),
            block_number: 7,
            tx_id: TxId::derive(&[b"log"]),
            log_index: 2,
        }
    }

    #[test]
    fn test_topics_are_distinct_and_stable() {
        let topics: std::collections::HashSet<_> =
            EventCategory::ALL.iter().map(|c| c.topic()).collect();
        assert_eq!(topics.len(), 3);
        for category in EventCategory::ALL {
            assert_eq!(EventCategory::from_topic(&category.topic()), Some(category));
        }
        assert_eq!(EventCategory::from_topic(&[0u8; 32]), None);
    }

    #[test]
    fn test_action_routes_to_entry_point() {
        let s = subject();
        let grant = LedgerCall::for_action(s, "Maybank", &ActionType::ConsentGranted, None);
        assert_eq!(grant.method(), "grantConsent");
        let revoke = LedgerCall::for_action(s, "Maybank", &ActionType::ConsentRevoked, None);
        assert_eq!(revoke.method(), "revokeConsent");
        let used = LedgerCall::for_action(s, "Maybank", &ActionType::IdentityUsed, None);
        assert_eq!(used.method(), "logIdentityUsage");
        let custom =
            LedgerCall::for_action(s, "Maybank", &ActionType::deletion_request(), None);
        assert!(matches!(
            custom,
            LedgerCall::LogIdentityUsage { ref action, .. } if action == "DATA_DELETION_REQUESTED"
        ));
    }

    #[test]
    fn test_calldata_shape() {
        let call = LedgerCall::for_action(
            subject(),
            "Bank Negara Malaysia",
            &ActionType::ConsentGranted,
            Some(&ContentRef::new("QmTest")),
        );
        let json: serde_json::Value = serde_json::from_slice(&call.encode().unwrap()).unwrap();
        assert_eq!(json["method"], "grantConsent");
        assert_eq!(json["counterparty"], "Bank Negara Malaysia");
        assert_eq!(json["contentRef"], "QmTest");
        assert_eq!(LedgerCall::decode(&call.encode().unwrap()).unwrap(), call);
        assert!(LedgerCall::decode(b"{\"method\":\"selfDestruct\"}").is_err());
    }

    #[test]
    fn test_emitted_log_decodes() {
        let call = LedgerCall::for_action(subject(), "CIMB Bank", &ActionType::IdentityUsed, None);
        let (category, topics, data) = call.emitted_log().unwrap();
        assert_eq!(category, EventCategory::Usage);

        let decoded = decode_log(&raw(topics, &data)).unwrap();
        assert_eq!(decoded.category, EventCategory::Usage);
        assert_eq!(decoded.subject, subject());
        assert_eq!(decoded.action, ActionType::IdentityUsed);
        assert_eq!(decoded.counterparty, "CIMB Bank");
        assert_eq!(decoded.content_ref, None);
        assert_eq!(decoded.block_number, 7);
        assert_eq!(decoded.ledger_ref.log_index, 2);
    }

    #[test]
    fn test_decode_rejects_malformed_logs() {
        let s = *subject().as_bytes();
        // Missing subject topic.
        assert!(decode_log(&raw(vec![EventCategory::Granted.topic()], b"{}")).is_err());
        // Unknown category.
        assert!(decode_log(&raw(vec![[9u8; 32], s], b"{}")).is_err());
        // Usage payload without an action.
        let data = br#"{"counterparty":"Maybank"}"#;
        assert!(decode_log(&raw(vec![EventCategory::Usage.topic(), s], data)).is_err());
        // Unknown field.
        let data = br#"{"counterparty":"Maybank","amount":5}"#;
        assert!(decode_log(&raw(vec![EventCategory::Granted.topic(), s], data)).is_err());
    }
}
