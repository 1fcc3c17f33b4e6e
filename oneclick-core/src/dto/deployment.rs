//! Deployment record DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::deployment::{DeploymentRecord, RunStatus};

/// Summary view of a deployment run for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub id: Uuid,
    pub project_name: String,
    pub team_slug: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: RunStatus,
    pub deployment_name: Option<String>,
}

impl From<&DeploymentRecord> for DeploymentSummary {
    fn from(record: &DeploymentRecord) -> Self {
        Self {
            id: record.id,
            project_name: record.project_name.clone(),
            team_slug: record.team_slug.clone(),
            created_at: record.created_at,
            status: record.status.clone(),
            deployment_name: record.deployment_name.clone(),
        }
    }
}
