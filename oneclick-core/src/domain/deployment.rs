//! Deployment record domain types
//!
//! Records are kept by the deploy service for every accepted request so a
//! caller can inspect a run after its stream has closed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::Stage;

/// Deployment run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: Uuid,
    pub repo_url: String,
    pub team_slug: String,
    pub project_name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: RunStatus,
    /// Deployment identifier once the run has succeeded
    pub deployment_name: Option<String>,
    pub stages: Vec<StageRecord>,
}

/// Status of a run or of a single stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Success { duration_ms: u64 },
    Error { error: String, duration_ms: u64 },
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, RunStatus::Pending)
    }
}

/// Record of one stage of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub label: String,
    pub status: RunStatus,
    /// Number of command output lines forwarded while the stage ran
    pub log_lines: u64,
}

impl DeploymentRecord {
    /// Creates a pending record for an accepted request
    pub fn pending(id: Uuid, repo_url: &str, team_slug: &str, project_name: &str) -> Self {
        Self {
            id,
            repo_url: repo_url.to_string(),
            team_slug: team_slug.to_string(),
            project_name: project_name.to_string(),
            created_at: chrono::Utc::now(),
            status: RunStatus::Pending,
            deployment_name: None,
            stages: Vec::new(),
        }
    }

    /// Record of the most recently started stage
    pub fn current_stage(&self) -> Option<&StageRecord> {
        self.stages.last()
    }
}
