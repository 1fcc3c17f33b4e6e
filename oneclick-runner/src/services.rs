//! Remote services used by the pipeline
//!
//! The pipeline talks to the credential exchange and to object storage
//! through these traits, so runs can be exercised without the network.

use async_trait::async_trait;
use oneclick_client::{ClientError, ProvisionClient, StorageClient};
use oneclick_core::domain::token::AccessToken;
use reqwest::Client;

/// Exchanges the caller's auth token for a deployment access token
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(
        &self,
        provision_url: &str,
        auth_token: &str,
    ) -> Result<AccessToken, ClientError>;
}

/// Sends asset bytes to a reserved upload URL
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Returns the storage handle of the uploaded object
    async fn upload(
        &self,
        upload_url: &str,
        content_type: &str,
        contents: Vec<u8>,
    ) -> Result<String, ClientError>;
}

/// [`CredentialExchange`] over HTTP
///
/// The endpoint can be overridden per request, so a [`ProvisionClient`] is
/// built per call on top of one shared connection pool.
#[derive(Debug, Clone)]
pub struct ProvisionExchange {
    client: Client,
}

impl ProvisionExchange {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialExchange for ProvisionExchange {
    async fn exchange(
        &self,
        provision_url: &str,
        auth_token: &str,
    ) -> Result<AccessToken, ClientError> {
        ProvisionClient::with_client(provision_url, self.client.clone())
            .exchange_token(auth_token)
            .await
    }
}

#[async_trait]
impl AssetStorage for StorageClient {
    async fn upload(
        &self,
        upload_url: &str,
        content_type: &str,
        contents: Vec<u8>,
    ) -> Result<String, ClientError> {
        StorageClient::upload(self, upload_url, content_type, contents).await
    }
}
