//! Blob store client with a credential-gated degraded mode.

use chrono::Utc;
use consent_crypto::ContentRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{HttpPinningApi, MetadataUpdate, PinMetadata, PinRequest, PinningApi};
use crate::credential::is_structurally_valid_jwt;
use crate::error::BlobResult;

/// Tag written on every pin so documents can be found later.
pub const APP_TAG: &str = "consent-ledger";

/// Kind of document being stored. Only affects its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Consent grant record.
    Consent,
    /// Consent revocation record.
    Revocation,
    /// Identity usage log.
    Usage,
    /// Data deletion request.
    DeletionRequest,
    /// Anything else.
    Generic,
}

impl DocumentKind {
    /// Human-readable label used as the pin name prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Consent => "consent-record",
            Self::Revocation => "consent-revocation",
            Self::Usage => "usage-log",
            Self::DeletionRequest => "deletion-request",
            Self::Generic => "document",
        }
    }

    /// Tag value written to the pin's key-values.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Consent => "consent",
            Self::Revocation => "revocation",
            Self::Usage => "usage",
            Self::DeletionRequest => "deletion_request",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Client settings.
#[derive(Clone)]
pub struct BlobStoreConfig {
    /// Base URL of the pinning API.
    pub api_url: String,
    /// Public gateway base URL.
    pub gateway_url: String,
    /// Bearer JWT.
    pub jwt: Option<String>,
    /// Request timeout.
    pub upload_timeout: Duration,
}

impl fmt::Debug for BlobStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStoreConfig")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("has_jwt", &self.jwt.is_some())
            .field("upload_timeout", &self.upload_timeout)
            .finish()
    }
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud/ipfs".to_string(),
            jwt: None,
            upload_timeout: Duration::from_secs(30),
        }
    }
}

/// Stores JSON documents and returns their content references.
///
/// Without a structurally valid credential the client is *degraded*: it
/// never touches the network and every upload returns a synthetic CID.
pub struct BlobStoreClient {
    api: Option<Arc<dyn PinningApi>>,
    gateway_url: String,
}

impl fmt::Debug for BlobStoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStoreClient")
            .field("degraded", &self.is_degraded())
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}

impl BlobStoreClient {
    /// Create a client over `api`, enabled only if `credential` is a
    /// structurally valid JWT.
    #[must_use]
    pub fn new(
        api: Arc<dyn PinningApi>,
        credential: Option<&str>,
        gateway_url: impl Into<String>,
    ) -> Self {
        let enabled = credential.is_some_and(is_structurally_valid_jwt);
        if !enabled {
            debug!("no valid pinning credential, blob store running degraded");
        }
        Self {
            api: enabled.then_some(api),
            gateway_url: gateway_url.into(),
        }
    }

    /// A client that never touches the network.
    #[must_use]
    pub fn degraded(gateway_url: impl Into<String>) -> Self {
        Self {
            api: None,
            gateway_url: gateway_url.into(),
        }
    }

    /// Build the HTTP client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BlobError::Config`] if a valid credential is present
    /// but the transport cannot be built.
    pub fn from_config(config: &BlobStoreConfig) -> BlobResult<Self> {
        match config.jwt.as_deref() {
            Some(jwt) if is_structurally_valid_jwt(jwt) => {
                let api = HttpPinningApi::new(&config.api_url, jwt, config.upload_timeout)?;
                Ok(Self::new(Arc::new(api), Some(jwt), config.gateway_url.clone()))
            },
            Some(_) => {
                debug!("pinning credential is malformed, blob store running degraded");
                Ok(Self::degraded(config.gateway_url.clone()))
            },
            None => {
                debug!("no pinning credential, blob store running degraded");
                Ok(Self::degraded(config.gateway_url.clone()))
            },
        }
    }

    /// Whether uploads are synthesized locally.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.api.is_none()
    }

    /// Public gateway link for a reference.
    #[must_use]
    pub fn gateway_url(&self, cid: &ContentRef) -> String {
        format!("{}/{}", self.gateway_url.trim_end_matches('/'), cid)
    }

    /// Store a document.
    ///
    /// The metadata tagging that follows a successful pin is best effort;
    /// its failure is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin request fails. Never fails when degraded.
    pub async fn upload(&self, document: &Value, kind: DocumentKind) -> BlobResult<ContentRef> {
        let Some(api) = &self.api else {
            let cid = ContentRef::synthetic();
            debug!(%cid, %kind, "blob store degraded, returning synthetic reference");
            return Ok(cid);
        };

        let name = format!("{}-{}", kind.label(), Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let request = PinRequest {
            pinata_content: document.clone(),
            pinata_metadata: PinMetadata { name: name.clone() },
        };
        let cid = api.pin_json(&request).await?;
        info!(%cid, %kind, "Document pinned");

        let update = MetadataUpdate {
            ipfs_pin_hash: cid.as_str().to_string(),
            name,
            keyvalues: BTreeMap::from([
                ("kind".to_string(), kind.tag().to_string()),
                ("app".to_string(), APP_TAG.to_string()),
            ]),
        };
        if let Err(e) = api.update_metadata(&update).await {
            warn!(%cid, error = %e, "Failed to tag pinned document");
        }

        Ok(cid)
    }
}
