//! API Module
//!
//! HTTP API layer for the deploy service.
//! Each submodule handles endpoints for a specific concern.

pub mod deploy;
pub mod deployments;
pub mod error;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};
use oneclick_runner::DeploymentPipeline;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::registry::DeploymentRegistry;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: DeploymentPipeline,
    pub registry: Arc<DeploymentRegistry>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Deployment endpoints
        .route("/deploy", post(deploy::deploy))
        .route("/deployments", get(deployments::list_deployments))
        .route("/deployments/{id}", get(deployments::get_deployment))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
