//! Static asset domain types

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions accepted for upload and their content types
pub const CONTENT_TYPES: [(&str, &str); 4] = [
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("svg", "image/svg+xml"),
];

/// Returns the content type for a file, or `None` when the extension is not uploadable
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
}

/// A build output file ready for upload
#[derive(Debug, Clone)]
pub struct AssetRecord {
    /// Path relative to the build output directory, `/`-separated
    pub path: String,
    pub content_type: &'static str,
    pub contents: Vec<u8>,
}

/// Registration payload sent to the deployment backend after upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRegistration {
    pub path: String,
    pub id: String,
    pub content_type: String,
}
