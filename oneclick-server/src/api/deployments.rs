//! Deployment Record API Handlers
//!
//! Read-only views of the deployment registry.

use axum::{
    Json,
    extract::{Path, State},
};
use oneclick_core::domain::deployment::DeploymentRecord;
use oneclick_core::dto::deployment::DeploymentSummary;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// GET /deployments
/// List recent deployments, newest first
pub async fn list_deployments(State(state): State<AppState>) -> Json<Vec<DeploymentSummary>> {
    tracing::debug!("Listing deployments");
    Json(state.registry.list())
}

/// GET /deployments/{id}
/// Get a deployment record with its stages
pub async fn get_deployment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeploymentRecord>> {
    tracing::debug!("Getting deployment: {}", id);

    state
        .registry
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Deployment {} not found", id)))
}
