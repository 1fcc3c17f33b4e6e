use anyhow::Context;
use oneclick_runner::{DeploymentPipeline, PipelineConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod registry;
pub mod stream;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::registry::DeploymentRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "oneclick_server=info,oneclick_runner=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting oneclick deploy service...");

    let server_config = ServerConfig::from_env().context("Failed to load server configuration")?;
    server_config
        .validate()
        .context("Invalid server configuration")?;

    let pipeline_config =
        PipelineConfig::from_env().context("Failed to load pipeline configuration")?;
    tracing::info!(
        "Using git at {}, bun at {}, minimum deployment CLI {}",
        pipeline_config.git_path,
        pipeline_config.bun_path,
        pipeline_config.min_cli_version
    );

    let pipeline =
        DeploymentPipeline::from_config(pipeline_config).context("Failed to set up pipeline")?;

    let state = AppState {
        pipeline,
        registry: Arc::new(DeploymentRegistry::new(server_config.history_limit)),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", server_config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
