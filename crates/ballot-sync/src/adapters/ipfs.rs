//! Blob store adapter for an IPFS-style content-addressed HTTP API.

use crate::config::SessionConfig;
use crate::domain::{BlobRef, SyncError};
use crate::ports::BlobStore;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// `add` endpoint response.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// HTTP client for the blob store API.
pub struct IpfsStore {
    client: reqwest::Client,
    api_url: String,
    files_dir: String,
}

impl IpfsStore {
    /// Connect to a blob store API endpoint.
    pub fn new(api_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_url: api_url.into(),
            files_dir: "/ballot-uploads".to_string(),
        }
    }

    /// Build the client from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.blob_api_url.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    async fn files_mkdir(&self) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.endpoint("/api/v0/files/mkdir"))
            .query(&[("arg", self.files_dir.as_str()), ("parents", "true")])
            .send()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError::StoreUnavailable(format!(
                "mkdir returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn files_cp(&self, blob_ref: &BlobRef) -> Result<(), SyncError> {
        let source = format!("/ipfs/{blob_ref}");
        let dest = format!("{}/{blob_ref}", self.files_dir);
        let response = self
            .client
            .post(self.endpoint("/api/v0/files/cp"))
            .query(&[("arg", source.as_str()), ("arg", dest.as_str())])
            .send()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError::StoreUnavailable(format!(
                "cp returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for IpfsStore {
    async fn put(&self, bytes: &[u8]) -> Result<BlobRef, SyncError> {
        let part = multipart::Part::bytes(bytes.to_vec()).file_name("candidate-image");
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/api/v0/add"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError::StoreUnavailable(format!(
                "add returned {}",
                response.status()
            )));
        }

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
        debug!(content_id = %added.hash, "blob stored");
        Ok(BlobRef::new(added.hash))
    }

    async fn organize(&self, blob_ref: &BlobRef) -> Result<(), SyncError> {
        // mkdir is idempotent with parents=true; its failure does not gate
        // the copy attempt.
        if let Err(err) = self.files_mkdir().await {
            debug!(%err, "mkdir before cp failed");
        }
        self.files_cp(blob_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let store = IpfsStore::new("http://localhost:5001/");
        assert_eq!(
            store.endpoint("/api/v0/add"),
            "http://localhost:5001/api/v0/add"
        );
    }

    #[test]
    fn test_add_response_parse() {
        let added: AddResponse =
            serde_json::from_str(r#"{"Name":"candidate-image","Hash":"QmcidC","Size":"42"}"#)
                .unwrap();
        assert_eq!(added.hash, "QmcidC");
    }
}
