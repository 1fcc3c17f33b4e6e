//! Deployment record command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use oneclick_client::DeployServiceClient;
use oneclick_core::domain::deployment::{DeploymentRecord, RunStatus};
use oneclick_core::dto::deployment::DeploymentSummary;

use crate::config::Config;
use crate::id_resolver::resolve_deployment_id;
use crate::types::IdOrPrefix;

/// Deployment subcommands
#[derive(Subcommand)]
pub enum DeploymentCommands {
    /// List recent deployments
    List,
    /// Get deployment details
    Get {
        /// Deployment ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_deployment_command(command: DeploymentCommands, config: &Config) -> Result<()> {
    let client = DeployServiceClient::new(&config.server_url);

    match command {
        DeploymentCommands::List => list_deployments(&client).await,
        DeploymentCommands::Get { id } => get_deployment(&client, &id).await,
    }
}

async fn list_deployments(client: &DeployServiceClient) -> Result<()> {
    let deployments = client.list_deployments().await?;

    if deployments.is_empty() {
        println!("{}", "No deployments found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} deployment(s):", deployments.len()).bold()
        );
        println!();
        for deployment in deployments {
            print_deployment_summary(&deployment);
        }
    }

    Ok(())
}

async fn get_deployment(client: &DeployServiceClient, id: &str) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = resolve_deployment_id(client, &id_or_prefix).await?;

    let record = client.get_deployment(uuid).await?;
    print_deployment_details(&record);

    Ok(())
}

fn print_deployment_summary(deployment: &DeploymentSummary) {
    println!(
        "  {} {} {}",
        "▸".cyan(),
        deployment.project_name.bold(),
        deployment.id.to_string().dimmed()
    );
    println!("    Team:     {}", deployment.team_slug);
    println!("    Status:   {}", colorize_status(&deployment.status));
    if let Some(name) = &deployment.deployment_name {
        println!("    Deployed: {}", name.green());
    }
    println!(
        "    Created:  {}",
        deployment
            .created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_deployment_details(record: &DeploymentRecord) {
    println!("{}", "Deployment Details:".bold());
    println!("  ID:         {}", record.id.to_string().cyan());
    println!("  Repository: {}", record.repo_url);
    println!("  Team:       {}", record.team_slug);
    println!("  Project:    {}", record.project_name);
    println!("  Status:     {}", colorize_status(&record.status));
    println!(
        "  Created:    {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(name) = &record.deployment_name {
        println!("  Deployment: {}", name.green());
    }

    if !record.stages.is_empty() {
        println!("\n{}", "Stages:".bold());
        for stage in &record.stages {
            println!(
                "  {:<40} {} {}",
                stage.label,
                colorize_status(&stage.status),
                format!("({} lines)", stage.log_lines).dimmed()
            );
        }
    }

    if let RunStatus::Error { error, .. } = &record.status {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn colorize_status(status: &RunStatus) -> ColoredString {
    match status {
        RunStatus::Pending => "pending".yellow(),
        RunStatus::Success { duration_ms } => {
            format!("success ({:.1}s)", *duration_ms as f64 / 1000.0).green()
        }
        RunStatus::Error { duration_ms, .. } => {
            format!("error ({:.1}s)", *duration_ms as f64 / 1000.0).red()
        }
    }
}
