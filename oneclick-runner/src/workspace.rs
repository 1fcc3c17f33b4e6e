//! Per-run scratch directories

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Temporary directory owned by exactly one run
///
/// Removed by [`Workspace::release`], or on drop if the run is abandoned.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh directory under `root`, or the system temp dir
    pub fn acquire(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("oneclick-");

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(PipelineError::Workspace)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(PipelineError::Workspace)?;

        debug!("Acquired workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory the repository is cloned into
    pub fn checkout_dir(&self, project_name: &str) -> PathBuf {
        self.dir.path().join(project_name)
    }

    /// Private home directory for the deployment CLI's credentials file
    pub fn home_dir(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Removes the directory and everything in it
    pub fn release(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(PipelineError::Workspace)?;
        debug!("Released workspace {}", path.display());
        Ok(())
    }
}
