//! Static asset publishing
//!
//! Projects that declare the build script get their build output uploaded
//! to the deployment's storage. For every file with a known content type:
//! reserve an upload URL through the deployment CLI, send the bytes, then
//! register the stored object under its relative path. Files with other
//! extensions are reported and skipped before anything is reserved.

use oneclick_core::domain::asset::{AssetRecord, AssetRegistration, content_type_for};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::command::CommandExecutor;
use crate::error::{PipelineError, Result};
use crate::events::EventSink;
use crate::services::AssetStorage;
use crate::tooling::Toolchain;

/// Result of one publishing pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
}

/// Whether `package.json` in `project_dir` declares `script`
///
/// A project without a manifest or without scripts has nothing to build.
pub async fn declares_build_script(project_dir: &Path, script: &str) -> Result<bool> {
    let manifest = match tokio::fs::read_to_string(project_dir.join("package.json")).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let manifest: serde_json::Value =
        serde_json::from_str(&manifest).map_err(|e| PipelineError::InvalidManifest(e.to_string()))?;

    Ok(manifest
        .get("scripts")
        .and_then(|scripts| scripts.get(script))
        .is_some())
}

/// Lists regular files below `root`, sorted by path
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PipelineError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop in build output")),
            )
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `/`-separated path of `file` relative to `root`
fn relative_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extracts the upload URL from `assets:startUpload` output
///
/// The function result is printed as JSON (a quoted string) on the last line.
pub fn parse_upload_url(lines: &[String]) -> Option<String> {
    let last = lines.iter().rev().find(|l| !l.trim().is_empty())?.trim();
    let url = serde_json::from_str::<String>(last).unwrap_or_else(|_| last.to_string());
    (url.starts_with("http://") || url.starts_with("https://")).then_some(url)
}

pub struct AssetPublisher<'a> {
    exec: &'a CommandExecutor,
    toolchain: &'a Toolchain<'a>,
    storage: &'a dyn AssetStorage,
    sink: &'a EventSink,
}

impl<'a> AssetPublisher<'a> {
    pub fn new(
        exec: &'a CommandExecutor,
        toolchain: &'a Toolchain<'a>,
        storage: &'a dyn AssetStorage,
        sink: &'a EventSink,
    ) -> Self {
        Self {
            exec,
            toolchain,
            storage,
            sink,
        }
    }

    /// Uploads and registers every publishable file below `output_dir`
    ///
    /// The first failing asset aborts the pass.
    pub async fn publish(&self, output_dir: &Path) -> Result<PublishSummary> {
        let mut summary = PublishSummary::default();

        if !output_dir.is_dir() {
            self.sink
                .status(format!(
                    "No build output found at {}, nothing to upload",
                    output_dir.file_name().unwrap_or_default().to_string_lossy()
                ))
                .await?;
            return Ok(summary);
        }

        for file in collect_files(output_dir)? {
            let path = relative_path(output_dir, &file);

            let Some(content_type) = content_type_for(&file) else {
                let ext = file
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                self.sink
                    .status(format!("Unknown file type {} for {}, skipping", ext, path))
                    .await?;
                summary.skipped.push(path);
                continue;
            };

            let contents = tokio::fs::read(&file)
                .await
                .map_err(|e| PipelineError::Io(e).for_asset(&path))?;
            let asset = AssetRecord {
                path,
                content_type,
                contents,
            };

            self.sink.status(format!("Uploading {}...", asset.path)).await?;
            let path = self.publish_one(asset).await?;
            summary.uploaded.push(path);
        }

        info!(
            "Published {} assets ({} skipped)",
            summary.uploaded.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    async fn publish_one(&self, asset: AssetRecord) -> Result<String> {
        let path = asset.path;

        let output = self
            .exec
            .capture(&self.toolchain.reserve_upload(), Some(self.sink))
            .await
            .map_err(|e| e.for_asset(&path))?;
        let upload_url = parse_upload_url(&output).ok_or_else(|| PipelineError::AssetUpload {
            path: path.clone(),
            reason: "no upload URL returned".to_string(),
        })?;

        let storage_id = self
            .storage
            .upload(&upload_url, asset.content_type, asset.contents)
            .await
            .map_err(|e| PipelineError::AssetUpload {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!("Stored {} as {}", path, storage_id);

        let registration = AssetRegistration {
            path: path.clone(),
            id: storage_id,
            content_type: asset.content_type.to_string(),
        };
        let register = self
            .toolchain
            .register_asset(&registration)
            .map_err(|e| e.for_asset(&path))?;
        self.exec
            .stream(&register, self.sink)
            .await
            .map_err(|e| e.for_asset(&path))?;

        Ok(path)
    }
}
