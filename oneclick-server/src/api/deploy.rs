//! Deploy API Handler
//!
//! Starts a pipeline run and streams its progress back as the response body.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::Response,
};
use futures_util::FutureExt;
use oneclick_core::dto::deploy::{DEPLOYMENT_ID_HEADER, DeploymentRequest};
use oneclick_runner::{EventSink, NoopObserver, StageObserver};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::stream::{PANIC_MESSAGE, progress_frames};

/// Events buffered between the pipeline and a slow reader
const EVENT_BUFFER: usize = 64;

/// POST /deploy
/// Run a deployment, answering with a `text/event-stream` of progress frames
///
/// Request problems found after parsing (e.g. an unusable repo URL) are
/// reported inside the stream as its single `error` frame.
pub async fn deploy(
    State(state): State<AppState>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::info!(
        "Deployment requested for {} (team {})",
        request.repo_url,
        request.team_slug
    );

    let (deployment_id, observer): (_, Arc<dyn StageObserver>) = match request.validate() {
        Ok(project_name) => {
            let id = state
                .registry
                .create(&request.repo_url, &request.team_slug, &project_name);
            (Some(id), state.registry.observer(id))
        }
        Err(_) => (None, Arc::new(NoopObserver)),
    };

    let (sink, events) = EventSink::channel(EVENT_BUFFER, observer);
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let pipeline = state.pipeline.clone();

    let registry = state.registry.clone();
    let started = Instant::now();

    let task = tokio::spawn(async move {
        // The outcome is reported through the sink
        let run = AssertUnwindSafe(pipeline.execute(request, &sink, run_cancel)).catch_unwind();
        if let Err(panic) = run.await {
            if let Some(id) = deployment_id {
                registry.mark_failed(id, PANIC_MESSAGE, started.elapsed());
            }
            tracing::error!("Deployment task panicked");
            std::panic::resume_unwind(panic);
        }
    });

    let body = Body::from_stream(progress_frames(events, task, cancel.drop_guard()));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache");
    if let Some(id) = deployment_id {
        response = response.header(DEPLOYMENT_ID_HEADER, id.to_string());
    }

    response
        .body(body)
        .map_err(|e| ApiError::InternalError(format!("Failed to build response: {}", e)))
}
