//! Per-counterparty rollup of an audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ActionType, AuditEvent};

/// Latest consent decision for one counterparty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    /// No grant or revoke seen.
    #[default]
    Unknown,
    /// Most recent decision was a grant.
    Granted,
    /// Most recent decision was a revoke.
    Revoked,
}

/// What the trail says about one counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartySummary {
    /// Latest consent decision.
    pub consent: ConsentState,
    /// When that decision was recorded.
    pub decided_at: Option<DateTime<Utc>>,
    /// Usage and custom events.
    pub usage_count: usize,
    /// Most recent usage.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Rollup of an audit trail, keyed by counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSummary {
    /// Per-counterparty state, sorted by name.
    pub counterparties: BTreeMap<String, CounterpartySummary>,
    /// Number of events summarised.
    pub total_events: usize,
    /// Whether any input event was synthetic.
    pub includes_synthetic: bool,
}

impl ConsentSummary {
    /// Counterparties whose latest decision is a grant.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.counterparties
            .iter()
            .filter(|(_, summary)| summary.consent == ConsentState::Granted)
            .map(|(name, _)| name.as_str())
    }
}

/// Summarise events in any order.
#[must_use]
pub fn summarize(events: &[AuditEvent]) -> ConsentSummary {
    let mut ordered: Vec<&AuditEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.position());

    let mut summary = ConsentSummary {
        total_events: events.len(),
        includes_synthetic: events.iter().any(|event| event.origin.is_synthetic()),
        ..ConsentSummary::default()
    };

    for event in ordered {
        let entry = summary
            .counterparties
            .entry(event.counterparty.clone())
            .or_default();
        match event.action {
            ActionType::ConsentGranted => {
                entry.consent = ConsentState::Granted;
                entry.decided_at = Some(event.occurred_at);
            },
            ActionType::ConsentRevoked => {
                entry.consent = ConsentState::Revoked;
                entry.decided_at = Some(event.occurred_at);
            },
            ActionType::IdentityUsed | ActionType::Custom(_) => {
                entry.usage_count = entry.usage_count.saturating_add(1);
                entry.last_used_at = Some(event.occurred_at);
            },
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;
    use consent_crypto::SubjectHandle;

    #[test]
    fn test_summarize_synthetic_trail() {
        let subject = SubjectHandle::hash("900101015678").unwrap();
        let summary = summarize(&synthetic::dataset(&subject));
        assert_eq!(summary.total_events, 6);
        assert!(summary.includes_synthetic);
        assert_eq!(
            summary.counterparties["Bank Negara Malaysia"].consent,
            ConsentState::Granted
        );
        assert_eq!(summary.counterparties["CIMB Bank"].consent, ConsentState::Revoked);
        assert_eq!(summary.counterparties["Maybank"].usage_count, 1);
        assert_eq!(summary.counterparties["Maybank"].consent, ConsentState::Unknown);
    }

    #[test]
    fn test_latest_decision_wins() {
        let subject = SubjectHandle::hash("900101015678").unwrap();
        let mut events = synthetic::dataset(&subject);
        // Revoke after grant for the same counterparty.
        events[0].counterparty = "CIMB Bank".to_string();
        let summary = summarize(&events);
        assert_eq!(summary.counterparties["CIMB Bank"].consent, ConsentState::Granted);
        assert_eq!(summary.granted().count(), 2);
    }
}
