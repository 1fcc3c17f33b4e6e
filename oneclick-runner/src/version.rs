//! Deployment CLI version gate

use semver::Version;

use crate::error::{PipelineError, Result};

/// Extracts the CLI version from `--version` output
///
/// Takes the last token that parses as a version, so banners such as
/// `convex 1.17.4` or a bare `v1.17.4` both work.
pub fn parse_cli_version(lines: &[String]) -> Option<Version> {
    lines
        .iter()
        .rev()
        .flat_map(|line| line.split_whitespace().rev())
        .find_map(|token| Version::parse(token.trim_start_matches('v')).ok())
}

/// Fails unless the reported version is at least `minimum`
pub fn ensure_supported(lines: &[String], minimum: &Version) -> Result<Version> {
    let found = parse_cli_version(lines)
        .ok_or_else(|| PipelineError::VersionUnreadable(lines.join(" ")))?;

    if found < *minimum {
        return Err(PipelineError::VersionGate {
            found: found.to_string(),
            minimum: minimum.to_string(),
        });
    }

    Ok(found)
}
