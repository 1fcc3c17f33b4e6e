//! Command lines of the external tools
//!
//! Builds the [`CommandSpec`] for every step that shells out: the source
//! control client, the package manager and the deployment CLI. The access
//! token only ever reaches the deployment CLI, through its environment or a
//! credentials file, and never through arguments.

use oneclick_core::domain::asset::AssetRegistration;
use oneclick_core::domain::token::AccessToken;
use std::path::{Path, PathBuf};

use crate::config::{PipelineConfig, TokenDelivery};
use crate::command::CommandSpec;
use crate::error::Result;

/// Clones `repo_url` into `dest`
///
/// `--` ends option parsing, so the URL is never taken as a flag.
pub fn clone_repo(config: &PipelineConfig, repo_url: &str, dest: &Path) -> CommandSpec {
    CommandSpec::new(&config.git_path)
        .arg("clone")
        .arg("--")
        .arg(repo_url)
        .arg(dest.to_string_lossy())
}

/// Makes `token` available to the deployment CLI
///
/// Returns the environment overlay for deployment CLI calls. With
/// [`TokenDelivery::CredentialsFile`] the file is written below `home`.
pub async fn authorize(
    delivery: &TokenDelivery,
    token: &AccessToken,
    home: &Path,
) -> Result<Vec<(String, String)>> {
    match delivery {
        TokenDelivery::Environment { variable } => {
            Ok(vec![(variable.clone(), token.expose().to_string())])
        }
        TokenDelivery::CredentialsFile => {
            let dir = home.join(".convex");
            tokio::fs::create_dir_all(&dir).await?;
            let contents = serde_json::json!({ "accessToken": token.expose() }).to_string();
            tokio::fs::write(dir.join("config.json"), contents).await?;
            Ok(vec![("HOME".to_string(), home.to_string_lossy().to_string())])
        }
    }
}

/// Package manager and deployment CLI invocations inside one project
pub struct Toolchain<'a> {
    config: &'a PipelineConfig,
    project_dir: PathBuf,
    auth_env: Vec<(String, String)>,
}

impl<'a> Toolchain<'a> {
    pub fn new(config: &'a PipelineConfig, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_dir: project_dir.into(),
            auth_env: Vec::new(),
        }
    }

    /// Attaches the environment overlay returned by [`authorize`]
    pub fn with_auth(mut self, auth_env: Vec<(String, String)>) -> Self {
        self.auth_env = auth_env;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn install(&self) -> CommandSpec {
        self.package_manager().arg("install")
    }

    /// Runs the asset build script declared in `package.json`
    pub fn build(&self) -> CommandSpec {
        self.package_manager().arg("run").arg(&self.config.build_script)
    }

    pub fn cli_version(&self) -> CommandSpec {
        self.deploy_cli().arg("--version")
    }

    /// Creates a new project under `team` and pushes the backend once
    pub fn deploy(&self, team_slug: &str, project_name: &str) -> CommandSpec {
        self.deploy_cli().args([
            "dev",
            "--once",
            "--configure",
            "new",
            "--team",
            team_slug,
            "--project",
            project_name,
        ])
    }

    pub fn set_env(&self, name: &str, value: &str) -> CommandSpec {
        self.deploy_cli()
            .args(["env", "set", name])
            .secret_arg(value)
    }

    /// Asks the deployment for a one-shot upload URL
    pub fn reserve_upload(&self) -> CommandSpec {
        self.deploy_cli().args(["run", "assets:startUpload"])
    }

    pub fn register_asset(&self, registration: &AssetRegistration) -> Result<CommandSpec> {
        let payload = serde_json::to_string(registration).map_err(std::io::Error::other)?;
        Ok(self
            .deploy_cli()
            .args(["run", "assets:uploadAsset"])
            .arg(payload))
    }

    fn package_manager(&self) -> CommandSpec {
        CommandSpec::new(&self.config.bun_path).cwd(&self.project_dir)
    }

    fn deploy_cli(&self) -> CommandSpec {
        self.package_manager()
            .args(self.config.deploy_cli_args.iter().cloned())
            .envs(&self.auth_env)
    }
}
