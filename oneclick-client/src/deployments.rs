//! Deployment-related API endpoints

use oneclick_core::domain::deployment::DeploymentRecord;
use oneclick_core::domain::event::ProgressEvent;
use oneclick_core::dto::deploy::DeploymentRequest;
pub use oneclick_core::dto::deploy::DEPLOYMENT_ID_HEADER;
use oneclick_core::dto::deployment::DeploymentSummary;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::DeployServiceClient;
use crate::ensure_success;
use crate::error::{ClientError, Result};
use crate::stream::FrameDecoder;

impl DeployServiceClient {
    // =============================================================================
    // Deployment Lifecycle
    // =============================================================================

    /// Trigger a deployment and open its progress stream
    ///
    /// # Example
    /// ```no_run
    /// # use oneclick_client::DeployServiceClient;
    /// # use oneclick_core::dto::deploy::DeploymentRequest;
    /// # async fn example(req: DeploymentRequest) -> anyhow::Result<()> {
    /// let client = DeployServiceClient::new("http://localhost:8080");
    /// let mut stream = client.deploy(&req).await?;
    /// while let Some(event) = stream.next_event().await? {
    ///     println!("{:?}", event);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn deploy(&self, req: &DeploymentRequest) -> Result<DeploymentStream> {
        let url = format!("{}/deploy", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;
        let response = ensure_success(response).await?;

        let deployment_id = response
            .headers()
            .get(DEPLOYMENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());

        Ok(DeploymentStream {
            deployment_id,
            response,
            decoder: FrameDecoder::new(),
            queued: VecDeque::new(),
            finished: false,
        })
    }

    /// List recent deployments
    pub async fn list_deployments(&self) -> Result<Vec<DeploymentSummary>> {
        let url = format!("{}/deployments", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a deployment record by ID
    pub async fn get_deployment(&self, id: Uuid) -> Result<DeploymentRecord> {
        let url = format!("{}/deployments/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}

/// Live progress stream of one deployment
pub struct DeploymentStream {
    deployment_id: Option<Uuid>,
    response: reqwest::Response,
    decoder: FrameDecoder,
    queued: VecDeque<ProgressEvent>,
    finished: bool,
}

impl DeploymentStream {
    /// Id of the deployment record, when the service reported one
    pub fn deployment_id(&self) -> Option<Uuid> {
        self.deployment_id
    }

    /// Waits for the next event; `None` once the stream has ended
    ///
    /// Nothing is returned after a terminal event.
    pub async fn next_event(&mut self) -> Result<Option<ProgressEvent>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if let Some(event) = self.queued.pop_front() {
                if event.is_terminal() {
                    self.finished = true;
                    self.queued.clear();
                }
                return Ok(Some(event));
            }

            match self.response.chunk().await? {
                Some(chunk) => {
                    let events = self.decoder.push(&chunk)?;
                    self.queued.extend(events);
                }
                None => {
                    self.finished = true;
                    if self.decoder.has_pending() {
                        return Err(ClientError::ParseError(
                            "Stream ended inside a frame".to_string(),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }
}
