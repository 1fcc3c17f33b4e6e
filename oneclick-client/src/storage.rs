//! Object storage upload endpoint

use reqwest::{Client, Method, header};
use tracing::debug;

use crate::ensure_success;
use crate::error::{ClientError, Result};

/// HTTP client for uploading bytes to reserved storage URLs
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    method: Method,
}

impl StorageClient {
    /// Create a storage client sending uploads with the given HTTP method
    pub fn new(client: Client, method: Method) -> Self {
        Self { client, method }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Upload raw bytes to a reserved URL and return the storage handle
    ///
    /// The endpoint answers with `{"storageId": "..."}`.
    pub async fn upload(&self, url: &str, content_type: &str, contents: Vec<u8>) -> Result<String> {
        debug!("Uploading {} bytes ({}) to storage", contents.len(), content_type);

        let response = self
            .client
            .request(self.method.clone(), url)
            .header(header::CONTENT_TYPE, content_type)
            .body(contents)
            .send()
            .await?;

        let response = ensure_success(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse upload response: {}", e)))?;

        body.get("storageId")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::ParseError("Upload response has no storageId".to_string()))
    }
}

impl Default for StorageClient {
    fn default() -> Self {
        Self::new(Client::new(), Method::POST)
    }
}
