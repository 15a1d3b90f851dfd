//! Pinning service transport.

use async_trait::async_trait;
use consent_crypto::ContentRef;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::error::{BlobError, BlobResult};

/// Body of a JSON pin request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    /// The document to pin.
    pub pinata_content: Value,
    /// Display metadata.
    pub pinata_metadata: PinMetadata,
}

/// Display metadata attached at pin time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinMetadata {
    /// Human-readable name.
    pub name: String,
}

/// Body of a metadata update for an existing pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    /// CID of the pinned document.
    pub ipfs_pin_hash: String,
    /// Human-readable name.
    pub name: String,
    /// Searchable tags.
    pub keyvalues: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Transport to a pinning service.
#[async_trait]
pub trait PinningApi: Send + Sync {
    /// Pin a JSON document, returning its CID.
    async fn pin_json(&self, request: &PinRequest) -> BlobResult<ContentRef>;

    /// Update the name and tags of an existing pin.
    async fn update_metadata(&self, update: &MetadataUpdate) -> BlobResult<()>;
}

/// Pinata-compatible HTTP transport.
pub struct HttpPinningApi {
    client: Client,
    api_url: Url,
    authorization: HeaderValue,
}

impl std::fmt::Debug for HttpPinningApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPinningApi")
            .field("api_url", &self.api_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpPinningApi {
    /// Create a transport with bearer authentication and a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Config`] if the URL or token is unusable or the
    /// HTTP client cannot be built.
    pub fn new(api_url: &str, jwt: &str, timeout: Duration) -> BlobResult<Self> {
        let mut api_url = Url::parse(api_url)
            .map_err(|e| BlobError::Config(format!("invalid pinning API URL: {e}")))?;
        // Endpoints are joined relative to the base path.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let mut authorization = HeaderValue::try_from(format!("Bearer {}", jwt.trim()))
            .map_err(|e| BlobError::Config(format!("invalid credential characters: {e}")))?;
        authorization.set_sensitive(true);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            authorization,
        })
    }

    fn endpoint(&self, path: &str) -> BlobResult<Url> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BlobError::Config(format!("invalid endpoint path {path}: {e}")))
    }

    async fn check(response: reqwest::Response, operation: &str) -> BlobResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, operation, "Pinning API error");
        Err(BlobError::UploadFailed {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PinningApi for HttpPinningApi {
    async fn pin_json(&self, request: &PinRequest) -> BlobResult<ContentRef> {
        let url = self.endpoint("pinning/pinJSONToIPFS")?;
        debug!(name = %request.pinata_metadata.name, "Pinning document");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .json(request)
            .send()
            .await?;
        let response = Self::check(response, "pin").await?;

        let body: PinResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Serialization(format!("unexpected pin response: {e}")))?;
        Ok(ContentRef::new(body.ipfs_hash))
    }

    async fn update_metadata(&self, update: &MetadataUpdate) -> BlobResult<()> {
        let url = self.endpoint("pinning/hashMetadata")?;
        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .json(update)
            .send()
            .await?;
        Self::check(response, "metadata").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_request_shape() {
        let request = PinRequest {
            pinata_content: serde_json::json!({"actionType": "CONSENT_GRANTED"}),
            pinata_metadata: PinMetadata {
                name: "consent-record".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["pinataContent"]["actionType"], "CONSENT_GRANTED");
        assert_eq!(json["pinataMetadata"]["name"], "consent-record");
    }

    #[test]
    fn test_metadata_update_shape() {
        let update = MetadataUpdate {
            ipfs_pin_hash: "QmTest".to_string(),
            name: "usage-log".to_string(),
            keyvalues: BTreeMap::from([("kind".to_string(), "usage".to_string())]),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["ipfsPinHash"], "QmTest");
        assert_eq!(json["keyvalues"]["kind"], "usage");
    }

    #[test]
    fn test_endpoint_join() {
        let api = HttpPinningApi::new(
            "https://api.pinata.cloud",
            "a.b.c",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            api.endpoint("/pinning/pinJSONToIPFS").unwrap().as_str(),
            "https://api.pinata.cloud/pinning/pinJSONToIPFS"
        );
        let debug = format!("{api:?}");
        assert!(!debug.contains("a.b.c"));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        for base in ["https://gateway.example/v1", "https://gateway.example/v1/"] {
            let api = HttpPinningApi::new(base, "a.b.c", Duration::from_secs(5)).unwrap();
            assert_eq!(
                api.endpoint("pinning/hashMetadata").unwrap().as_str(),
                "https://gateway.example/v1/pinning/hashMetadata"
            );
            assert_eq!(
                api.endpoint("/pinning/pinJSONToIPFS").unwrap().as_str(),
                "https://gateway.example/v1/pinning/pinJSONToIPFS"
            );
        }
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(
            HttpPinningApi::new("not a url", "a.b.c", Duration::from_secs(5)),
            Err(BlobError::Config(_))
        ));
    }

    #[test]
    fn test_pin_response_decodes() {
        let body: PinResponse = serde_json::from_str(
            r#"{"IpfsHash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","PinSize":12,"Timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(body.ipfs_hash, "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
    }
}
