//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod deployments;

pub use deploy::DeployArgs;
pub use deployments::DeploymentCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a repository and follow its progress
    Deploy(DeployArgs),
    /// Inspect past deployments
    Deployments {
        #[command(subcommand)]
        command: DeploymentCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Deploy(args) => deploy::handle_deploy(args, config).await,
        Commands::Deployments { command } => {
            deployments::handle_deployment_command(command, config).await
        }
    }
}
