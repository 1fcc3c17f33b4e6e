//! ID resolver module
//!
//! Resolves UUID prefixes to full UUIDs by querying the deploy service, so
//! users can type short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use oneclick_client::DeployServiceClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a deployment ID or prefix to a full UUID
///
/// Full UUIDs are returned as-is; prefixes are matched against the
/// deployment list.
pub async fn resolve_deployment_id(
    client: &DeployServiceClient,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let deployments = client
        .list_deployments()
        .await
        .context("Failed to fetch deployments for ID resolution")?;

    pick_unique(id_or_prefix, deployments.iter().map(|d| d.id))
}

/// Picks the single id matched by `id_or_prefix`
fn pick_unique(id_or_prefix: &IdOrPrefix, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids.filter(|id| id_or_prefix.matches(id)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No deployment found with ID starting with '{}'",
            id_or_prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple deployments: {}",
                id_or_prefix,
                ids.join(", ")
            ))
        }
    }
}
