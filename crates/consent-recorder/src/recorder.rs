//! Recording façade.

use chrono::Utc;
use consent_blobstore::{BlobStoreClient, DocumentKind};
use consent_crypto::{ContentRef, SubjectHandle};
use consent_ledger::{
    ActionType, AuditEvent, ConsentSummary, DELETION_REQUESTED, EventQuery, LedgerError,
    LedgerWriter, Origin, Receipt, summarize,
};
use consent_session::SessionManager;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{RecorderError, RecorderResult};

/// Outcome of one [`ConsentRecorder::record`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResult {
    /// Subject handle of the identifier.
    pub subject: SubjectHandle,
    /// Ledger or synthetic receipt.
    pub receipt: Receipt,
    /// Reference to the stored metadata document.
    pub content_ref: ContentRef,
    /// Same as `receipt.origin`.
    pub origin: Origin,
}

/// Blob store kind for an action.
#[must_use]
pub fn document_kind(action: &ActionType) -> DocumentKind {
    match action {
        ActionType::ConsentGranted => DocumentKind::Consent,
        ActionType::ConsentRevoked => DocumentKind::Revocation,
        ActionType::IdentityUsed => DocumentKind::Usage,
        ActionType::Custom(label) if label == DELETION_REQUESTED => DocumentKind::DeletionRequest,
        ActionType::Custom(_) => DocumentKind::Generic,
    }
}

/// Records consent actions and reads back audit trails.
///
/// Holds a shared [`SessionManager`]; it never changes session state, only
/// reads the current signer.
pub struct ConsentRecorder {
    blob_store: BlobStoreClient,
    session: Arc<SessionManager>,
    writer: LedgerWriter,
    query: EventQuery,
}

impl std::fmt::Debug for ConsentRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentRecorder")
            .field("blob_store", &self.blob_store)
            .field("session", &self.session)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl ConsentRecorder {
    /// Compose a recorder from its collaborators.
    #[must_use]
    pub fn new(
        blob_store: BlobStoreClient,
        session: Arc<SessionManager>,
        writer: LedgerWriter,
        query: EventQuery,
    ) -> Self {
        Self {
            blob_store,
            session,
            writer,
            query,
        }
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// The blob store client.
    #[must_use]
    pub fn blob_store(&self) -> &BlobStoreClient {
        &self.blob_store
    }

    /// Record one action for `identifier`.
    ///
    /// The metadata document is stored first. If a session is connected the
    /// action is then written to the ledger; without a session, or when the
    /// write fails, a synthetic receipt is returned instead.
    ///
    /// # Errors
    ///
    /// - [`RecorderError::InvalidInput`] for an empty identifier,
    ///   counterparty or action label
    /// - [`RecorderError::UploadFailed`] if the document cannot be stored
    /// - [`RecorderError::ContractNotDeployed`] if the contract is missing
    pub async fn record(
        &self,
        identifier: &str,
        counterparty: &str,
        action: &ActionType,
        details: Value,
    ) -> RecorderResult<RecordResult> {
        let subject = SubjectHandle::hash(identifier)
            .map_err(|e| RecorderError::InvalidInput(e.to_string()))?;
        let counterparty = counterparty.trim();
        if counterparty.is_empty() {
            return Err(RecorderError::InvalidInput(
                "counterparty must not be empty".to_string(),
            ));
        }
        if action.as_str().trim().is_empty() {
            return Err(RecorderError::InvalidInput(
                "action must not be empty".to_string(),
            ));
        }

        let document = json!({
            "subjectHandle": subject,
            "counterpartyId": counterparty,
            "actionType": action,
            "details": details,
            "recordedAt": Utc::now().to_rfc3339(),
        });
        let content_ref = self
            .blob_store
            .upload(&document, document_kind(action))
            .await
            .inspect_err(|e| error!(error = %e, "Metadata upload failed"))?;

        let receipt = if self.session.is_connected() {
            match self
                .writer
                .write(&self.session, &subject, counterparty, action, Some(&content_ref))
                .await
            {
                Ok(receipt) => receipt,
                Err(LedgerError::ContractNotDeployed { address }) => {
                    error!(%address, "Consent contract not deployed");
                    return Err(RecorderError::ContractNotDeployed { address });
                },
                Err(e) => {
                    warn!(error = %e, "Ledger write failed, issuing synthetic receipt");
                    Receipt::synthetic()
                },
            }
        } else {
            info!("No signing session, issuing synthetic receipt");
            Receipt::synthetic()
        };

        info!(
            %subject,
            action = %action,
            origin = ?receipt.origin,
            tx_id = %receipt.tx_id(),
            "Consent action recorded"
        );

        Ok(RecordResult {
            subject,
            origin: receipt.origin,
            receipt,
            content_ref,
        })
    }

    /// Audit trail for `identifier`, newest first.
    ///
    /// # Errors
    ///
    /// [`RecorderError::InvalidInput`] for an empty identifier;
    /// [`RecorderError::Query`] if the query fails and the synthetic
    /// fallback is disabled.
    pub async fn history(&self, identifier: &str) -> RecorderResult<Vec<AuditEvent>> {
        let subject = SubjectHandle::hash(identifier)
            .map_err(|e| RecorderError::InvalidInput(e.to_string()))?;
        Ok(self.query.query(Some(&subject)).await?)
    }

    /// Audit trail across all subjects, newest first.
    ///
    /// # Errors
    ///
    /// [`RecorderError::Query`] if the query fails and the synthetic
    /// fallback is disabled.
    pub async fn all_events(&self) -> RecorderResult<Vec<AuditEvent>> {
        Ok(self.query.query(None).await?)
    }

    /// Per-counterparty rollup of the subject's own events.
    ///
    /// [`Self::history`] can fall back to other subjects' events; those are
    /// left out here.
    ///
    /// # Errors
    ///
    /// As [`Self::history`].
    pub async fn summary(&self, identifier: &str) -> RecorderResult<ConsentSummary> {
        let subject = SubjectHandle::hash(identifier)
            .map_err(|e| RecorderError::InvalidInput(e.to_string()))?;
        let own: Vec<AuditEvent> = self
            .query
            .query(Some(&subject))
            .await?
            .into_iter()
            .filter(|event| event.subject == subject)
            .collect();
        Ok(summarize(&own))
    }
}
