//! Pipeline configuration
//!
//! Defines all configurable parameters of a deployment run: tool locations,
//! the provisioning endpoint, the tooling version gate, how the access token
//! reaches the deployment CLI, asset build settings and timeouts.

use reqwest::Method;
use semver::Version;
use std::path::PathBuf;
use std::time::Duration;

/// Default credential exchange endpoint
pub const DEFAULT_PROVISION_URL: &str = "https://provision.convex.dev";

/// Default minimum supported deployment CLI version
pub const DEFAULT_MIN_CLI_VERSION: &str = "1.17.0";

/// How the access token is handed to the deployment CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDelivery {
    /// Set the given variable in the CLI's environment
    Environment { variable: String },
    /// Write `{"accessToken": ...}` to `<home>/.convex/config.json` inside
    /// the workspace and point `HOME` at it
    CredentialsFile,
}

impl TokenDelivery {
    /// Parses `env` / `file` as used by `ONECLICK_TOKEN_DELIVERY`
    pub fn parse(value: &str, variable: String) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "env" | "environment" => Ok(Self::Environment { variable }),
            "file" | "credentials-file" => Ok(Self::CredentialsFile),
            other => anyhow::bail!("Unknown token delivery '{}', expected 'env' or 'file'", other),
        }
    }
}

/// Deployment pipeline configuration
///
/// Shared read-only by every run; nothing here is mutated per request.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source control client executable
    pub git_path: String,

    /// Package manager executable, also used to launch the deployment CLI
    pub bun_path: String,

    /// Arguments that turn `bun_path` into the deployment CLI (`x convex`)
    pub deploy_cli_args: Vec<String>,

    /// Credential exchange endpoint used when the request has no override
    pub provision_url: String,

    /// Lowest deployment CLI version the deploy flags are known to work with
    pub min_cli_version: Version,

    pub token_delivery: TokenDelivery,

    /// `package.json` script that builds static assets
    pub build_script: String,

    /// Directory (relative to the project) the build script writes to
    pub build_output_dir: String,

    /// File the deployment CLI writes the deployment URL to
    pub env_file: String,

    /// Suffix of the env file key holding the deployment URL
    pub deployment_url_key: String,

    /// Parent directory for workspaces; system temp dir when unset
    pub workspace_root: Option<PathBuf>,

    /// Prefix prepended to the derived project name
    pub project_prefix: String,

    /// Upper bound for a single command invocation
    pub command_timeout: Option<Duration>,

    /// Upper bound for a single HTTP call
    pub http_timeout: Option<Duration>,

    /// HTTP method used to send asset bytes to storage
    pub upload_method: Method,
}

impl PipelineConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            git_path: "git".to_string(),
            bun_path: default_bun_path(),
            deploy_cli_args: vec!["x".to_string(), "convex".to_string()],
            provision_url: DEFAULT_PROVISION_URL.to_string(),
            min_cli_version: Version::new(1, 17, 0),
            token_delivery: TokenDelivery::Environment {
                variable: "CONVEX_OVERRIDE_ACCESS_TOKEN".to_string(),
            },
            build_script: "oneclick-build".to_string(),
            build_output_dir: "dist".to_string(),
            env_file: ".env.local".to_string(),
            deployment_url_key: "CONVEX_URL".to_string(),
            workspace_root: None,
            project_prefix: String::new(),
            command_timeout: Some(Duration::from_secs(900)),
            http_timeout: Some(Duration::from_secs(60)),
            upload_method: Method::POST,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional:
    /// - ONECLICK_GIT_BIN, ONECLICK_BUN_BIN
    /// - ONECLICK_PROVISION_URL
    /// - ONECLICK_MIN_CLI_VERSION (semver, default: 1.17.0)
    /// - ONECLICK_TOKEN_DELIVERY (env | file, default: env)
    /// - ONECLICK_TOKEN_ENV_VAR (default: CONVEX_OVERRIDE_ACCESS_TOKEN)
    /// - ONECLICK_BUILD_SCRIPT, ONECLICK_BUILD_OUTPUT_DIR, ONECLICK_ENV_FILE
    /// - ONECLICK_WORKSPACE_ROOT, ONECLICK_PROJECT_PREFIX
    /// - ONECLICK_COMMAND_TIMEOUT, ONECLICK_HTTP_TIMEOUT (seconds, 0 disables)
    /// - ONECLICK_UPLOAD_METHOD (POST | PUT)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Some(git) = env_var("ONECLICK_GIT_BIN") {
            config.git_path = git;
        }
        if let Some(bun) = env_var("ONECLICK_BUN_BIN") {
            config.bun_path = bun;
        }
        if let Some(url) = env_var("ONECLICK_PROVISION_URL") {
            config.provision_url = url;
        }
        if let Some(version) = env_var("ONECLICK_MIN_CLI_VERSION") {
            config.min_cli_version = Version::parse(&version).map_err(|e| {
                anyhow::anyhow!("ONECLICK_MIN_CLI_VERSION '{}' is not a valid version: {}", version, e)
            })?;
        }

        let token_var = env_var("ONECLICK_TOKEN_ENV_VAR")
            .unwrap_or_else(|| "CONVEX_OVERRIDE_ACCESS_TOKEN".to_string());
        config.token_delivery = match env_var("ONECLICK_TOKEN_DELIVERY") {
            Some(value) => TokenDelivery::parse(&value, token_var)?,
            None => TokenDelivery::Environment {
                variable: token_var,
            },
        };

        if let Some(script) = env_var("ONECLICK_BUILD_SCRIPT") {
            config.build_script = script;
        }
        if let Some(dir) = env_var("ONECLICK_BUILD_OUTPUT_DIR") {
            config.build_output_dir = dir;
        }
        if let Some(file) = env_var("ONECLICK_ENV_FILE") {
            config.env_file = file;
        }
        config.workspace_root = env_var("ONECLICK_WORKSPACE_ROOT").map(PathBuf::from);
        if let Some(prefix) = env_var("ONECLICK_PROJECT_PREFIX") {
            config.project_prefix = prefix;
        }
        if let Some(timeout) = timeout_var("ONECLICK_COMMAND_TIMEOUT")? {
            config.command_timeout = timeout;
        }
        if let Some(timeout) = timeout_var("ONECLICK_HTTP_TIMEOUT")? {
            config.http_timeout = timeout;
        }
        if let Some(method) = env_var("ONECLICK_UPLOAD_METHOD") {
            config.upload_method = match method.to_uppercase().as_str() {
                "POST" => Method::POST,
                "PUT" => Method::PUT,
                other => anyhow::bail!("ONECLICK_UPLOAD_METHOD must be POST or PUT, got '{}'", other),
            };
        }

        Ok(config)
    }

    /// Sets the token delivery
    pub fn with_token_delivery(mut self, delivery: TokenDelivery) -> Self {
        self.token_delivery = delivery;
        self
    }

    /// Sets the workspace parent directory
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.git_path.is_empty() {
            anyhow::bail!("git_path cannot be empty");
        }

        if self.bun_path.is_empty() {
            anyhow::bail!("bun_path cannot be empty");
        }

        if !self.provision_url.starts_with("http://") && !self.provision_url.starts_with("https://")
        {
            anyhow::bail!("provision_url must start with http:// or https://");
        }

        if let TokenDelivery::Environment { variable } = &self.token_delivery {
            if variable.is_empty() || variable.contains('=') {
                anyhow::bail!("token environment variable name '{}' is invalid", variable);
            }
        }

        if self.build_script.is_empty() {
            anyhow::bail!("build_script cannot be empty");
        }

        if !oneclick_core::naming::is_safe_relative_path(&self.build_output_dir) {
            anyhow::bail!("build_output_dir must be a relative path inside the project");
        }

        if self.env_file.is_empty() || self.deployment_url_key.is_empty() {
            anyhow::bail!("env_file and deployment_url_key cannot be empty");
        }

        if self.command_timeout == Some(Duration::ZERO) || self.http_timeout == Some(Duration::ZERO)
        {
            anyhow::bail!("timeouts must be greater than 0 (leave unset to disable)");
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `~/.bun/bin/bun`, falling back to `bun` on the PATH
fn default_bun_path() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home)
            .join(".bun")
            .join("bin")
            .join("bun")
            .to_string_lossy()
            .to_string(),
        _ => "bun".to_string(),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads a timeout in seconds; `0` disables the timeout
fn timeout_var(name: &str) -> anyhow::Result<Option<Option<Duration>>> {
    match env_var(name) {
        None => Ok(None),
        Some(value) => {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got '{}'", name, value))?;
            Ok(Some(if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            }))
        }
    }
}
