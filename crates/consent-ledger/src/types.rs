//! Core ledger types: action vocabulary, receipts, and audit events.

use chrono::{DateTime, Utc};
use consent_crypto::{ContentRef, SubjectHandle, TxId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::abi::EventCategory;

/// Wire name used for a data-deletion request.
pub const DELETION_REQUESTED: &str = "DATA_DELETION_REQUESTED";

/// What happened to a subject's identity.
///
/// The three well-known actions map to dedicated contract entry points.
/// Anything else is carried verbatim as [`ActionType::Custom`] and logged
/// through the usage entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// The identity was presented to or used by a counterparty.
    IdentityUsed,
    /// The subject granted consent to a counterparty.
    ConsentGranted,
    /// The subject revoked a previously granted consent.
    ConsentRevoked,
    /// Any other action label, e.g. [`DELETION_REQUESTED`].
    Custom(String),
}

impl ActionType {
    /// Parse an action label leniently.
    ///
    /// Matching ignores case and separators, so `consent-granted`,
    /// `ConsentGranted` and `CONSENT_GRANTED` are the same action. Unknown
    /// labels become [`ActionType::Custom`] with the trimmed input.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "IDENTITYUSED" => Self::IdentityUsed,
            "CONSENTGRANTED" => Self::ConsentGranted,
            "CONSENTREVOKED" => Self::ConsentRevoked,
            _ => Self::Custom(raw.trim().to_string()),
        }
    }

    /// Convenience constructor for a deletion request.
    #[must_use]
    pub fn deletion_request() -> Self {
        Self::Custom(DELETION_REQUESTED.to_string())
    }

    /// Canonical wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::IdentityUsed => "IDENTITY_USED",
            Self::ConsentGranted => "CONSENT_GRANTED",
            Self::ConsentRevoked => "CONSENT_REVOKED",
            Self::Custom(label) => label,
        }
    }

    /// The ledger event category this action is recorded under.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            Self::ConsentGranted => EventCategory::Granted,
            Self::ConsentRevoked => EventCategory::Revoked,
            Self::IdentityUsed | Self::Custom(_) => EventCategory::Usage,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Where a receipt or event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Confirmed on the ledger.
    Ledger,
    /// Fabricated locally because the ledger was unavailable or empty.
    Synthetic,
}

impl Origin {
    /// Whether this is locally fabricated data.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::Synthetic)
    }
}

/// Position of an event on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    /// Transaction that emitted the event.
    pub tx_id: TxId,
    /// Index of the log within its block.
    pub log_index: u32,
}

/// Proof that a write happened (or a synthetic stand-in for one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction and log position.
    pub ledger_ref: LedgerRef,
    /// Block the transaction landed in. `0` for synthetic receipts.
    pub block_number: u64,
    /// Gas consumed. `0` for synthetic receipts.
    pub gas_used: u64,
    /// Wall-clock time of the confirming block, or of fabrication.
    pub recorded_at: DateTime<Utc>,
    /// Ledger or synthetic.
    pub origin: Origin,
}

impl Receipt {
    /// A locally fabricated receipt with a random transaction id.
    #[must_use]
    pub fn synthetic() -> Self {
        Self {
            ledger_ref: LedgerRef {
                tx_id: TxId::random(),
                log_index: 0,
            },
            block_number: 0,
            gas_used: 0,
            recorded_at: Utc::now(),
            origin: Origin::Synthetic,
        }
    }

    /// Transaction id of this receipt.
    #[must_use]
    pub fn tx_id(&self) -> TxId {
        self.ledger_ref.tx_id
    }
}

/// One entry in a subject's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Subject the event concerns.
    pub subject: SubjectHandle,
    /// What happened.
    pub action: ActionType,
    /// Who it happened with.
    pub counterparty: String,
    /// Off-ledger document, if one was attached.
    pub content_ref: Option<ContentRef>,
    /// Timestamp of the containing block.
    pub occurred_at: DateTime<Utc>,
    /// Containing block.
    pub block_number: u64,
    /// Transaction and log position.
    pub ledger_ref: LedgerRef,
    /// Ledger or synthetic.
    pub origin: Origin,
}

impl AuditEvent {
    /// Ordering key: newest block first, then highest log index.
    #[must_use]
    pub fn position(&self) -> (u64, u32) {
        (self.block_number, self.ledger_ref.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_is_lenient() {
        assert_eq!(ActionType::parse("CONSENT_GRANTED"), ActionType::ConsentGranted);
        assert_eq!(ActionType::parse("consent-granted"), ActionType::ConsentGranted);
        assert_eq!(ActionType::parse("ConsentRevoked"), ActionType::ConsentRevoked);
        assert_eq!(ActionType::parse(" identity used "), ActionType::IdentityUsed);
        assert_eq!(
            ActionType::parse(" KYC_CHECK "),
            ActionType::Custom("KYC_CHECK".to_string())
        );
    }

    #[test]
    fn test_action_category() {
        assert_eq!(ActionType::ConsentGranted.category(), EventCategory::Granted);
        assert_eq!(ActionType::ConsentRevoked.category(), EventCategory::Revoked);
        assert_eq!(ActionType::IdentityUsed.category(), EventCategory::Usage);
        assert_eq!(ActionType::deletion_request().category(), EventCategory::Usage);
    }

    #[test]
    fn test_action_serde_uses_wire_names() {
        let json = serde_json::to_string(&ActionType::ConsentGranted).unwrap();
        assert_eq!(json, "\"CONSENT_GRANTED\"");
        let custom: ActionType = serde_json::from_str("\"DATA_DELETION_REQUESTED\"").unwrap();
        assert_eq!(custom, ActionType::deletion_request());
    }

    #[test]
    fn test_synthetic_receipt() {
        let receipt = Receipt::synthetic();
        assert_eq!(receipt.origin, Origin::Synthetic);
        assert_eq!(receipt.block_number, 0);
        assert_eq!(receipt.gas_used, 0);
        assert_eq!(receipt.tx_id().to_hex().len(), 66);
        assert_ne!(receipt.tx_id(), Receipt::synthetic().tx_id());
    }

    #[test]
    fn test_origin_serde() {
        assert_eq!(serde_json::to_string(&Origin::Synthetic).unwrap(), "\"synthetic\"");
        assert!(Origin::Synthetic.is_synthetic());
        assert!(!Origin::Ledger.is_synthetic());
    }
}
