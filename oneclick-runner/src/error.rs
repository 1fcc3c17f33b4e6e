//! Pipeline errors
//!
//! Every failure of a deployment run ends up as one of these variants. The
//! `Display` text is what the caller sees in the terminal error event, so it
//! never contains the access token or env var values.

use oneclick_client::ClientError;
use oneclick_core::dto::deploy::RequestIssue;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(RequestIssue),

    #[error("Failed to exchange auth token: {0}")]
    AuthExchange(#[source] ClientError),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Command {command} failed with {}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("Command {command} timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error(
        "Deployment tooling version {found} is older than the minimum supported version {minimum}"
    )]
    VersionGate { found: String, minimum: String },

    #[error("Could not determine deployment tooling version from: {0}")]
    VersionUnreadable(String),

    #[error("Project path '{0}' does not exist in the repository")]
    ProjectPathNotFound(String),

    #[error("Invalid package.json: {0}")]
    InvalidManifest(String),

    #[error("Failed to resolve deployment: {0}")]
    IdentifierResolution(String),

    #[error("Failed to upload asset {path}: {reason}")]
    AssetUpload { path: String, reason: String },

    #[error("Workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("return code {}", code),
        None => "no return code (terminated by signal)".to_string(),
    }
}

impl PipelineError {
    /// Whether the failure came from a command exiting unsuccessfully or
    /// not starting at all
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Spawn { .. })
    }

    /// Folds command and storage failures of one asset into [`PipelineError::AssetUpload`]
    ///
    /// Cancellation and timeouts pass through unchanged.
    pub fn for_asset(self, path: &str) -> Self {
        match self {
            Self::CommandFailed { .. } | Self::Spawn { .. } | Self::Io(_) => Self::AssetUpload {
                path: path.to_string(),
                reason: self.to_string(),
            },
            other => other,
        }
    }
}
