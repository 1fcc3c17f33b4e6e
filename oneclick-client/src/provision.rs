//! Credential exchange endpoint

use oneclick_core::domain::token::AccessToken;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::ensure_success;

/// Device name reported to the provisioning service
pub const DEVICE_NAME: &str = "oneclick-deploy";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeRequest<'a> {
    authn_token: &'a str,
    device_name: &'a str,
}

/// HTTP client for the provisioning service
#[derive(Debug, Clone)]
pub struct ProvisionClient {
    base_url: String,
    client: Client,
}

impl ProvisionClient {
    /// Create a new provisioning client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the provisioning service (e.g., "https://provision.convex.dev")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a provisioning client sharing a configured reqwest client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange a caller auth token for an access token
    ///
    /// Single attempt, no retries. Transport failures and non-2xx answers
    /// surface as [`ClientError::RequestFailed`] / [`ClientError::ApiError`];
    /// a 2xx answer without a string `accessToken` surfaces as
    /// [`ClientError::ParseError`].
    pub async fn exchange_token(&self, auth_token: &str) -> Result<AccessToken> {
        let url = format!("{}/api/authorize", self.base_url);
        debug!("Exchanging auth token at {}", url);

        let response = self
            .client
            .post(&url)
            .json(&AuthorizeRequest {
                authn_token: auth_token,
                device_name: DEVICE_NAME,
            })
            .send()
            .await?;

        let response = ensure_success(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse authorize response: {}", e)))?;

        match body.get("accessToken").and_then(|t| t.as_str()) {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(ClientError::ParseError("Invalid access token".to_string())),
        }
    }
}
