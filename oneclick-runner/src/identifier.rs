//! Deployment identifier resolution
//!
//! After a successful deploy the CLI writes the deployment URL into the
//! project's env file (`VITE_CONVEX_URL=https://happy-otter-123.convex.cloud`).
//! The identifier is the first DNS label of that URL's host.

use oneclick_core::naming::deployment_name_from_url;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Key the CLI uses for the `<type>:<name>` deployment selector
const DEPLOYMENT_SELECTOR_KEY: &str = "CONVEX_DEPLOYMENT";

/// Reads the env file in `project_dir` and returns the deployment identifier
pub async fn resolve_deployment_name(project_dir: &Path, config: &PipelineConfig) -> Result<String> {
    let path = project_dir.join(&config.env_file);
    let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
        PipelineError::IdentifierResolution(format!("cannot read {}: {}", config.env_file, e))
    })?;

    parse_deployment_name(&contents, &config.deployment_url_key).ok_or_else(|| {
        PipelineError::IdentifierResolution(format!(
            "no deployment URL found in {}",
            config.env_file
        ))
    })
}

/// Finds the identifier in env file contents
///
/// Prefers a `*<url_key>=` entry; falls back to the deployment selector.
pub fn parse_deployment_name(contents: &str, url_key: &str) -> Option<String> {
    let entries: Vec<(&str, &str)> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), strip_comment(value)))
        .collect();

    let from_url = entries
        .iter()
        .filter(|(key, _)| key.ends_with(url_key))
        .find_map(|(_, value)| deployment_name_from_url(value));
    if from_url.is_some() {
        return from_url;
    }

    entries
        .iter()
        .find(|(key, _)| *key == DEPLOYMENT_SELECTOR_KEY)
        .and_then(|(_, value)| {
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            let name = value.split_once(':').map_or(value, |(_, name)| name);
            (!name.is_empty()).then(|| name.to_string())
        })
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(pos) => value[..pos].trim(),
        None => value.trim(),
    }
}
