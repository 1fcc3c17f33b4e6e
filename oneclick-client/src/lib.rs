//! Oneclick HTTP Clients
//!
//! Type-safe HTTP clients used across the oneclick crates:
//! - [`ProvisionClient`]: exchanges a caller auth token for an access token
//! - [`StorageClient`]: uploads asset bytes to a reserved storage URL
//! - [`DeployServiceClient`]: talks to the oneclick deploy service (CLI side)
//!
//! # Example
//!
//! ```no_run
//! use oneclick_client::ProvisionClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ProvisionClient::new("https://provision.convex.dev");
//!     let token = client.exchange_token("authn-token").await?;
//!     println!("Exchanged token: {:?}", token);
//!     Ok(())
//! }
//! ```

pub mod error;
mod deployments;
mod provision;
mod storage;
pub mod stream;

// Re-export commonly used types
pub use deployments::{DEPLOYMENT_ID_HEADER, DeploymentStream};
pub use error::{ClientError, Result};
pub use provision::{DEVICE_NAME, ProvisionClient};
pub use storage::StorageClient;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds a reqwest client with an optional overall request timeout
pub fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// HTTP client for the oneclick deploy service API
///
/// Groups the endpoints of the deploy service:
/// - Triggering a deployment and following its progress stream
/// - Listing and inspecting deployment records
#[derive(Debug, Clone)]
pub struct DeployServiceClient {
    /// Base URL of the deploy service (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl DeployServiceClient {
    /// Create a new deploy service client
    ///
    /// # Example
    /// ```
    /// use oneclick_client::DeployServiceClient;
    ///
    /// let client = DeployServiceClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new deploy service client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the deploy service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Turns a non-2xx response into [`ClientError::ApiError`]
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::api_error(
            status.as_u16(),
            error::error_message_from_body(&body),
        ));
    }

    Ok(response)
}
