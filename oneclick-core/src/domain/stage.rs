//! Pipeline stage domain types

use serde::{Deserialize, Serialize};

/// One step of the deployment pipeline
///
/// Stages run strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authenticate,
    Clone,
    Install,
    VerifyTooling,
    Deploy,
    ConfigureEnv,
    ResolveDeployment,
    PublishAssets,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 8] = [
        Stage::Authenticate,
        Stage::Clone,
        Stage::Install,
        Stage::VerifyTooling,
        Stage::Deploy,
        Stage::ConfigureEnv,
        Stage::ResolveDeployment,
        Stage::PublishAssets,
    ];

    /// Status line emitted when the stage begins
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Authenticate => "Authenticating...",
            Stage::Clone => "Cloning repo...",
            Stage::Install => "Installing dependencies...",
            Stage::VerifyTooling => "Checking deployment tooling version...",
            Stage::Deploy => "Deploying to convex...",
            Stage::ConfigureEnv => "Configuring environment variables...",
            Stage::ResolveDeployment => "Resolving deployment...",
            Stage::PublishAssets => "Building for hosting...",
        }
    }

    /// Whether the stage always runs
    ///
    /// Optional stages only run when the request or project asks for them.
    pub fn is_required(&self) -> bool {
        !matches!(self, Stage::ConfigureEnv | Stage::PublishAssets)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Authenticate => "authenticate",
            Stage::Clone => "clone",
            Stage::Install => "install",
            Stage::VerifyTooling => "verify_tooling",
            Stage::Deploy => "deploy",
            Stage::ConfigureEnv => "configure_env",
            Stage::ResolveDeployment => "resolve_deployment",
            Stage::PublishAssets => "publish_assets",
        };
        write!(f, "{}", name)
    }
}
