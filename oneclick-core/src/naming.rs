//! Naming helpers
//!
//! Derivation of project names from repository URLs and of deployment
//! identifiers from deployment connection URLs.

/// Derives the project name from a repository URL
///
/// The name is the last path segment with a trailing `.git` removed:
/// `https://github.com/get-convex/prosemirror-sync.git` -> `prosemirror-sync`.
/// Returns `None` when no usable name can be derived.
pub fn project_name_from_repo_url(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':']).next()?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    // Would be read as an option by `git clone` or the deployment CLI
    if trimmed.starts_with('-') || name.starts_with('-') {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return None;
    }
    // A bare host such as `https://github.com` has no repository segment
    if trimmed.len() == segment.len() || trimmed.ends_with(&format!("//{}", segment)) {
        return None;
    }

    Some(name.to_string())
}

/// Extracts the deployment identifier from a deployment URL
///
/// The identifier is the first dot-separated label of the host:
/// `https://happy-otter-123.convex.cloud/api` -> `happy-otter-123`.
pub fn deployment_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_matches(|c| c == '"' || c == '\'');
    let without_scheme = match trimmed.find("://") {
        Some(pos) => &trimmed[pos + 3..],
        None => trimmed,
    };
    let host = without_scheme
        .split(['/', ':', '?', '#'])
        .next()
        .unwrap_or_default();
    let label = host.split('.').next().unwrap_or_default();

    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Checks that a project sub-path stays inside the cloned repository
pub fn is_safe_relative_path(path: &str) -> bool {
    let path = std::path::Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir))
}
