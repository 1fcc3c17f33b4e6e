//! Oneclick Deployment Pipeline
//!
//! Turns a [`DeploymentRequest`](oneclick_core::dto::deploy::DeploymentRequest)
//! into a live deployment by driving external tools in a throwaway
//! workspace, reporting progress as [`ProgressEvent`](oneclick_core::domain::event::ProgressEvent)s.
//!
//! # Example
//!
//! ```no_run
//! use oneclick_runner::{DeploymentPipeline, EventSink, NoopObserver, PipelineConfig};
//! use oneclick_core::dto::deploy::DeploymentRequest;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(request: DeploymentRequest) -> anyhow::Result<()> {
//! let pipeline = DeploymentPipeline::from_config(PipelineConfig::from_env()?)?;
//! let (sink, mut events) = EventSink::channel(64, Arc::new(NoopObserver));
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! pipeline.execute(request, &sink, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod identifier;
pub mod observer;
pub mod pipeline;
pub mod services;
pub mod tooling;
pub mod version;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use oneclick_client::ClientError;

pub use command::{CommandRunner, CommandSpec, ProcessRunner};
pub use config::{PipelineConfig, TokenDelivery};
pub use error::PipelineError;
pub use events::EventSink;
pub use observer::{NoopObserver, StageObserver};
pub use pipeline::DeploymentPipeline;
pub use services::{AssetStorage, CredentialExchange, ProvisionExchange};
