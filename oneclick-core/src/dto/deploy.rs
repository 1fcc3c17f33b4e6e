//! Deploy request DTO

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::naming::{is_safe_relative_path, project_name_from_repo_url};

/// Response header of the deploy endpoint carrying the deployment record id
pub const DEPLOYMENT_ID_HEADER: &str = "x-deployment-id";

/// Request to deploy a repository
///
/// Environment variables keep the order in which the caller supplied them.
#[derive(Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub repo_url: String,
    pub auth_token: String,
    pub team_slug: String,
    #[serde(default)]
    pub env_vars: IndexMap<String, String>,
    /// Override of the credential exchange endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_url: Option<String>,
    /// Sub-directory of the repository holding the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
}

/// Reasons a request is rejected before any work starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIssue {
    InvalidRepoUrl,
    MissingAuthToken,
    MissingTeamSlug,
    EmptyEnvVarName,
    InvalidProjectPath(String),
}

impl std::fmt::Display for RequestIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestIssue::InvalidRepoUrl => write!(f, "Invalid repo URL"),
            RequestIssue::MissingAuthToken => write!(f, "auth_token cannot be empty"),
            RequestIssue::MissingTeamSlug => write!(f, "team_slug cannot be empty"),
            RequestIssue::EmptyEnvVarName => write!(f, "environment variable names cannot be empty"),
            RequestIssue::InvalidProjectPath(path) => {
                write!(f, "project_path '{}' must be a relative path inside the repository", path)
            }
        }
    }
}

impl DeploymentRequest {
    /// Validates the request and returns the derived project name
    pub fn validate(&self) -> Result<String, RequestIssue> {
        let project_name =
            project_name_from_repo_url(&self.repo_url).ok_or(RequestIssue::InvalidRepoUrl)?;

        if self.auth_token.trim().is_empty() {
            return Err(RequestIssue::MissingAuthToken);
        }
        if self.team_slug.trim().is_empty() {
            return Err(RequestIssue::MissingTeamSlug);
        }
        if self.env_vars.keys().any(|k| k.trim().is_empty()) {
            return Err(RequestIssue::EmptyEnvVarName);
        }
        if let Some(path) = &self.project_path {
            if !is_safe_relative_path(path) {
                return Err(RequestIssue::InvalidProjectPath(path.clone()));
            }
        }

        Ok(project_name)
    }
}

impl std::fmt::Debug for DeploymentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentRequest")
            .field("repo_url", &self.repo_url)
            .field("auth_token", &"<redacted>")
            .field("team_slug", &self.team_slug)
            .field("env_vars", &self.env_vars.keys().collect::<Vec<_>>())
            .field("provision_url", &self.provision_url)
            .field("project_path", &self.project_path)
            .finish()
    }
}
