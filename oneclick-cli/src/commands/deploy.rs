//! Deploy command handler
//!
//! Sends a deployment request and renders the progress stream as it
//! arrives. The process exits non-zero when the deployment fails.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use oneclick_client::DeployServiceClient;
use oneclick_core::domain::event::ProgressEvent;
use oneclick_core::domain::stage::Stage;
use oneclick_core::dto::deploy::DeploymentRequest;

use crate::config::Config;

#[derive(Args)]
pub struct DeployArgs {
    /// Repository to deploy (any URL `git clone` accepts)
    #[arg(long)]
    repo_url: String,

    /// Team the new project is created under
    #[arg(long)]
    team: String,

    /// Auth token exchanged for a deployment access token
    #[arg(long, env = "ONECLICK_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Environment variable for the deployment (can be specified multiple times)
    #[arg(short, long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Override the credential exchange endpoint
    #[arg(long)]
    provision_url: Option<String>,

    /// Sub-directory of the repository holding the project
    #[arg(long)]
    path: Option<String>,
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub async fn handle_deploy(args: DeployArgs, config: &Config) -> Result<()> {
    let client = DeployServiceClient::new(&config.server_url);

    let request = DeploymentRequest {
        repo_url: args.repo_url,
        auth_token: args.auth_token,
        team_slug: args.team,
        env_vars: args.env.into_iter().collect(),
        provision_url: args.provision_url,
        project_path: args.path,
    };

    let mut stream = client
        .deploy(&request)
        .await
        .context("Failed to start deployment")?;

    if let Some(id) = stream.deployment_id() {
        println!("{} {}", "Deployment".bold(), id.to_string().dimmed());
    }

    while let Some(event) = stream
        .next_event()
        .await
        .context("Lost connection to the deploy service")?
    {
        println!("{}", render_event(&event));

        match event {
            ProgressEvent::Done(_) => return Ok(()),
            ProgressEvent::Error(message) => anyhow::bail!("Deployment failed: {}", message),
            ProgressEvent::Status(_) => {}
        }
    }

    anyhow::bail!("Deployment stream ended without a result")
}

/// Formats one event for the terminal
///
/// Stage labels stand out, command output is dimmed.
fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Status(line) if is_stage_label(line) => {
            format!("{} {}", "▸".cyan(), line.bold())
        }
        ProgressEvent::Status(line) => format!("  {}", line.dimmed()),
        ProgressEvent::Done(name) => format!("{} Deployed {}", "✓".green(), name.green().bold()),
        ProgressEvent::Error(message) => format!("{} {}", "✗".red(), message.red()),
    }
}

fn is_stage_label(line: &str) -> bool {
    Stage::ALL.iter().any(|stage| stage.label() == line)
}
