//! Deployment pipeline
//!
//! Drives one deployment from request to terminal event:
//!
//! 1. Validate the request (no side effects before this passes)
//! 2. Exchange the auth token for an access token
//! 3. Clone the repository into a fresh workspace
//! 4. Install dependencies and read the project manifest
//! 5. Check the deployment CLI version
//! 6. Create the project and deploy the backend
//! 7. Set the requested environment variables
//! 8. Resolve the deployment identifier
//! 9. Build and publish static assets, when the project declares a build
//!
//! Stages run strictly in order and the first failure ends the run. Every
//! run produces exactly one terminal event and leaves no workspace behind.

use oneclick_client::StorageClient;
use oneclick_core::domain::event::ProgressEvent;
use oneclick_core::domain::stage::Stage;
use oneclick_core::domain::token::AccessToken;
use oneclick_core::dto::deploy::DeploymentRequest;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::assets::{AssetPublisher, declares_build_script};
use crate::command::{CommandExecutor, CommandRunner, ProcessRunner};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::events::EventSink;
use crate::identifier::resolve_deployment_name;
use crate::services::{AssetStorage, CredentialExchange, ProvisionExchange};
use crate::tooling::{self, Toolchain};
use crate::version::ensure_supported;
use crate::workspace::Workspace;

/// Shared, stateless deployment pipeline
///
/// One instance serves any number of concurrent runs; all per-run state
/// lives in the workspace and the run's locals.
#[derive(Clone)]
pub struct DeploymentPipeline {
    config: Arc<PipelineConfig>,
    runner: Arc<dyn CommandRunner>,
    credentials: Arc<dyn CredentialExchange>,
    storage: Arc<dyn AssetStorage>,
}

/// Per-run state handed from stage to stage
struct RunContext<'a> {
    request: &'a DeploymentRequest,
    project_name: String,
    sink: &'a EventSink,
    exec: CommandExecutor,
}

impl DeploymentPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        runner: Arc<dyn CommandRunner>,
        credentials: Arc<dyn CredentialExchange>,
        storage: Arc<dyn AssetStorage>,
    ) -> Self {
        Self {
            config,
            runner,
            credentials,
            storage,
        }
    }

    /// Wires the pipeline to real processes and HTTP endpoints
    pub fn from_config(config: PipelineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let http = oneclick_client::http_client(config.http_timeout)?;
        let storage = StorageClient::new(http.clone(), config.upload_method.clone());

        Ok(Self::new(
            Arc::new(config),
            Arc::new(ProcessRunner::new()),
            Arc::new(ProvisionExchange::new(http)),
            Arc::new(storage),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one deployment, reporting progress through `sink`
    ///
    /// Always ends with exactly one terminal event on the sink: `done` with
    /// the deployment identifier, or `error` with the failure message. The
    /// same outcome is returned.
    pub async fn execute(
        &self,
        request: DeploymentRequest,
        sink: &EventSink,
        cancel: CancellationToken,
    ) -> Result<String> {
        let started = Instant::now();
        let result = self.run(&request, sink, cancel).await;

        match &result {
            Ok(name) => {
                info!(
                    "Deployment of {} finished as {} in {:?}",
                    request.repo_url,
                    name,
                    started.elapsed()
                );
                sink.observer().run_finished(Ok(name.as_str()), started.elapsed());
                sink.finish(ProgressEvent::done(name)).await;
            }
            Err(e) => {
                warn!("Deployment of {} failed: {}", request.repo_url, e);
                sink.observer().run_finished(Err(e), started.elapsed());
                sink.finish(ProgressEvent::error(e.to_string())).await;
            }
        }

        result
    }

    async fn run(
        &self,
        request: &DeploymentRequest,
        sink: &EventSink,
        cancel: CancellationToken,
    ) -> Result<String> {
        let project_name = request.validate().map_err(PipelineError::Validation)?;

        let workspace = Workspace::acquire(self.config.workspace_root.as_deref())?;
        let ctx = RunContext {
            request,
            project_name,
            sink,
            exec: CommandExecutor::new(self.runner.clone(), self.config.command_timeout, cancel),
        };

        let outcome = self.run_stages(&ctx, &workspace).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.release() {
            error!("Failed to remove workspace {}: {}", path.display(), e);
        }

        outcome
    }

    async fn run_stages(&self, ctx: &RunContext<'_>, workspace: &Workspace) -> Result<String> {
        let config = self.config.as_ref();
        let request = ctx.request;

        let token = self
            .stage(ctx, Stage::Authenticate, self.authenticate(request))
            .await?;

        let checkout = workspace.checkout_dir(&ctx.project_name);
        let project_dir = self
            .stage(ctx, Stage::Clone, async {
                let spec = tooling::clone_repo(config, &request.repo_url, &checkout);
                ctx.exec.stream(&spec, ctx.sink).await?;
                self.project_dir(request, checkout.clone()).await
            })
            .await?;

        let auth_env = tooling::authorize(&config.token_delivery, &token, &workspace.home_dir()).await?;
        let toolchain = Toolchain::new(config, project_dir.clone()).with_auth(auth_env);

        // The manifest is read along with the install so a broken one fails this stage
        let builds_assets = self
            .stage(ctx, Stage::Install, async {
                ctx.exec.stream(&toolchain.install(), ctx.sink).await?;
                declares_build_script(&project_dir, &config.build_script).await
            })
            .await?;

        self.stage(ctx, Stage::VerifyTooling, async {
            let output = ctx.exec.capture(&toolchain.cli_version(), Some(ctx.sink)).await?;
            let version = ensure_supported(&output, &config.min_cli_version)?;
            info!("Deployment CLI version {}", version);
            Ok(())
        })
        .await?;

        let deploy_name = format!("{}{}", config.project_prefix, ctx.project_name);
        let deploy_spec = toolchain.deploy(&request.team_slug, &deploy_name);
        self.stage(ctx, Stage::Deploy, ctx.exec.stream(&deploy_spec, ctx.sink))
            .await?;

        if !request.env_vars.is_empty() {
            self.stage(ctx, Stage::ConfigureEnv, async {
                for (name, value) in &request.env_vars {
                    ctx.sink.status(format!("Setting {}...", name)).await?;
                    ctx.exec.stream(&toolchain.set_env(name, value), ctx.sink).await?;
                }
                Ok(())
            })
            .await?;
        }

        let deployment_name = self
            .stage(
                ctx,
                Stage::ResolveDeployment,
                resolve_deployment_name(&project_dir, config),
            )
            .await?;

        if builds_assets {
            self.stage(ctx, Stage::PublishAssets, async {
                ctx.exec.stream(&toolchain.build(), ctx.sink).await?;
                let publisher =
                    AssetPublisher::new(&ctx.exec, &toolchain, self.storage.as_ref(), ctx.sink);
                publisher
                    .publish(&project_dir.join(&config.build_output_dir))
                    .await?;
                Ok(())
            })
            .await?;
        }

        Ok(deployment_name)
    }

    /// Announces `stage`, runs `work` and records how it ended
    async fn stage<T, F>(&self, ctx: &RunContext<'_>, stage: Stage, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        ctx.sink.begin(stage).await?;
        let started = Instant::now();
        let result = work.await;
        ctx.sink.end(stage, result.as_ref().err(), started.elapsed());
        result
    }

    async fn authenticate(&self, request: &DeploymentRequest) -> Result<AccessToken> {
        let provision_url = request
            .provision_url
            .as_deref()
            .unwrap_or(&self.config.provision_url);

        self.credentials
            .exchange(provision_url, &request.auth_token)
            .await
            .map_err(PipelineError::AuthExchange)
    }

    /// Directory of the project inside the checkout
    async fn project_dir(&self, request: &DeploymentRequest, checkout: PathBuf) -> Result<PathBuf> {
        match request.project_path.as_deref() {
            None => Ok(checkout),
            Some(sub) => {
                let dir = checkout.join(sub);
                if tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
                    Ok(dir)
                } else {
                    Err(PipelineError::ProjectPathNotFound(sub.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenDelivery;
    use crate::observer::{NoopObserver, StageObserver};
    use crate::testing::{FakeExchange, Project, RecordingStorage, ScriptedRunner};
    use indexmap::IndexMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const TOKEN: &str = "access-token-secret";

    struct Harness {
        root: TempDir,
        runner: Arc<ScriptedRunner>,
        exchange: Arc<FakeExchange>,
        storage: Arc<RecordingStorage>,
        config: PipelineConfig,
    }

    impl Harness {
        fn new(project: Project) -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = PipelineConfig {
                bun_path: "bun".to_string(),
                ..PipelineConfig::default()
            }
            .with_workspace_root(root.path());

            Self {
                root,
                runner: Arc::new(ScriptedRunner::new(project)),
                exchange: Arc::new(FakeExchange::ok(TOKEN)),
                storage: Arc::new(RecordingStorage::default()),
                config,
            }
        }

        fn pipeline(&self) -> DeploymentPipeline {
            DeploymentPipeline::new(
                Arc::new(self.config.clone()),
                self.runner.clone(),
                self.exchange.clone(),
                self.storage.clone(),
            )
        }

        async fn run(&self, request: DeploymentRequest) -> (Result<String>, Vec<ProgressEvent>) {
            self.run_observed(request, Arc::new(NoopObserver), CancellationToken::new())
                .await
        }

        async fn run_observed(
            &self,
            request: DeploymentRequest,
            observer: Arc<dyn StageObserver>,
            cancel: CancellationToken,
        ) -> (Result<String>, Vec<ProgressEvent>) {
            let (sink, mut rx) = EventSink::channel(4096, observer);
            let result = self.pipeline().execute(request, &sink, cancel).await;
            drop(sink);

            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            (result, events)
        }

        fn workspace_root_is_empty(&self) -> bool {
            std::fs::read_dir(self.root.path()).unwrap().next().is_none()
        }
    }

    fn request() -> DeploymentRequest {
        DeploymentRequest {
            repo_url: "https://github.com/acme/chat-app".to_string(),
            auth_token: "caller-auth".to_string(),
            team_slug: "acme".to_string(),
            env_vars: IndexMap::new(),
            provision_url: None,
            project_path: None,
        }
    }

    fn statuses(events: &[ProgressEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn assert_single_terminal(events: &[ProgressEvent]) {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "events: {:?}", events);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_successful_deployment() {
        let harness = Harness::new(Project::backend_only());
        let (result, events) = harness.run(request()).await;

        assert_eq!(result.unwrap(), "happy-otter-123");
        assert_single_terminal(&events);
        assert_eq!(events.last(), Some(&ProgressEvent::done("happy-otter-123")));

        let labels: Vec<String> = statuses(&events)
            .into_iter()
            .filter(|s| Stage::ALL.iter().any(|stage| stage.label() == s))
            .collect();
        assert_eq!(
            labels,
            vec![
                "Authenticating...",
                "Cloning repo...",
                "Installing dependencies...",
                "Checking deployment tooling version...",
                "Deploying to convex...",
                "Resolving deployment...",
            ]
        );

        let commands = harness.runner.commands();
        assert_eq!(commands.len(), 4);
        assert!(commands[0].starts_with("git clone -- https://github.com/acme/chat-app "));
        assert!(commands[0].ends_with("/chat-app"));
        assert_eq!(commands[1], "bun install");
        assert_eq!(commands[2], "bun x convex --version");
        assert_eq!(
            commands[3],
            "bun x convex dev --once --configure new --team acme --project chat-app"
        );
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_command_output_is_forwarded() {
        let harness = Harness::new(Project::backend_only());
        let (_, events) = harness.run(request()).await;
        let statuses = statuses(&events);

        let clone_label = statuses.iter().position(|s| s == "Cloning repo...").unwrap();
        let cloning = statuses.iter().position(|s| s.starts_with("Cloning into")).unwrap();
        let install_label = statuses
            .iter()
            .position(|s| s == "Installing dependencies...")
            .unwrap();
        assert!(clone_label < cloning && cloning < install_label);
    }

    #[tokio::test]
    async fn test_invalid_repo_url_has_no_side_effects() {
        let harness = Harness::new(Project::backend_only());
        let mut req = request();
        req.repo_url = "https://github.com/".to_string();

        let (result, events) = harness.run(req).await;

        assert!(matches!(result, Err(PipelineError::Validation(_))));
        assert_eq!(events, vec![ProgressEvent::error("Invalid repo URL")]);
        assert!(harness.runner.commands().is_empty());
        assert_eq!(harness.exchange.calls(), 0);
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_stops_before_clone() {
        let mut harness = Harness::new(Project::backend_only());
        harness.exchange = Arc::new(FakeExchange::failing(401));

        let (result, events) = harness.run(request()).await;

        assert!(matches!(result, Err(PipelineError::AuthExchange(_))));
        assert_single_terminal(&events);
        assert!(harness.runner.commands().is_empty());
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_provision_url_override() {
        let harness = Harness::new(Project::backend_only());
        let mut req = request();
        req.provision_url = Some("https://provision.example.test".to_string());

        harness.run(req).await.0.unwrap();
        assert_eq!(
            harness.exchange.last_url().as_deref(),
            Some("https://provision.example.test")
        );
    }

    #[tokio::test]
    async fn test_failed_install_stops_pipeline() {
        let harness = Harness::new(Project::backend_only());
        harness.runner.fail_on("install", 1);

        let (result, events) = harness.run(request()).await;

        assert!(matches!(
            result,
            Err(PipelineError::CommandFailed { exit_code: Some(1), .. })
        ));
        assert_single_terminal(&events);
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::error("Command bun install failed with return code 1"))
        );
        assert_eq!(harness.runner.commands().len(), 2);
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_old_cli_version_blocks_deploy() {
        let harness = Harness::new(Project::backend_only());
        harness.runner.set_cli_version("1.16.2");

        let (result, events) = harness.run(request()).await;

        assert!(matches!(result, Err(PipelineError::VersionGate { .. })));
        assert_single_terminal(&events);
        assert!(!harness.runner.commands().iter().any(|c| c.contains(" dev ")));
    }

    #[tokio::test]
    async fn test_version_gate_accepts_newer_minor() {
        let harness = Harness::new(Project::backend_only());
        harness.runner.set_cli_version("1.100.0");
        assert!(harness.run(request()).await.0.is_ok());
    }

    #[tokio::test]
    async fn test_env_vars_set_in_order_after_deploy() {
        let harness = Harness::new(Project::backend_only());
        let mut req = request();
        req.env_vars.insert("OPENAI_API_KEY".to_string(), "sk-1".to_string());
        req.env_vars.insert("APP_MODE".to_string(), "demo".to_string());

        let (result, events) = harness.run(req).await;
        assert!(result.is_ok());

        let commands = harness.runner.commands();
        let env_cmds: Vec<&String> = commands.iter().filter(|c| c.contains(" env set ")).collect();
        assert_eq!(
            env_cmds,
            vec![
                "bun x convex env set OPENAI_API_KEY ***",
                "bun x convex env set APP_MODE ***"
            ]
        );
        let deploy = commands.iter().position(|c| c.contains(" dev ")).unwrap();
        let first_env = commands.iter().position(|c| c.contains(" env set ")).unwrap();
        assert!(deploy < first_env);

        let statuses = statuses(&events);
        assert!(statuses.contains(&"Configuring environment variables...".to_string()));
        assert!(statuses.contains(&"Setting OPENAI_API_KEY...".to_string()));
        assert!(!statuses.iter().any(|s| s.contains("sk-1")));
    }

    #[tokio::test]
    async fn test_token_reaches_cli_only_through_environment() {
        let harness = Harness::new(Project::with_build());
        harness.run(request()).await.0.unwrap();

        for spec in harness.runner.specs() {
            assert!(!spec.args.iter().any(|a| a.contains(TOKEN)), "{:?}", spec);
            let has_token = spec
                .env
                .iter()
                .any(|(k, v)| k == "CONVEX_OVERRIDE_ACCESS_TOKEN" && v == TOKEN);
            let is_cli = spec.args.first().map(String::as_str) == Some("x");
            assert_eq!(has_token, is_cli, "{}", spec.display());
        }
    }

    #[tokio::test]
    async fn test_credentials_file_delivery() {
        let mut harness = Harness::new(Project::backend_only());
        harness.config.token_delivery = TokenDelivery::CredentialsFile;

        harness.run(request()).await.0.unwrap();

        let deploy = harness
            .runner
            .specs()
            .into_iter()
            .find(|s| s.has_arg("dev"))
            .unwrap();
        let home = deploy
            .env
            .iter()
            .find(|(k, _)| k == "HOME")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(home.starts_with(harness.root.path().to_str().unwrap()));
        assert_eq!(
            harness.runner.credentials_seen().as_deref(),
            Some(r#"{"accessToken":"access-token-secret"}"#)
        );
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_assets_published_and_unknown_types_skipped() {
        let harness = Harness::new(Project::with_build());
        let (result, events) = harness.run(request()).await;

        assert_eq!(result.unwrap(), "happy-otter-123");
        assert_single_terminal(&events);

        let uploads = harness.storage.uploads();
        let uploaded: Vec<(&str, &str)> = uploads
            .iter()
            .map(|(_, content_type, path_hint)| (path_hint.as_str(), content_type.as_str()))
            .collect();
        assert_eq!(
            uploaded,
            vec![
                ("a{}", "text/css"),
                ("console.log(1)", "text/javascript"),
                ("<html></html>", "text/html"),
            ]
        );

        let registrations = harness.runner.registrations();
        assert_eq!(registrations.len(), 3);
        assert_eq!(registrations[0]["path"], "assets/app.css");
        assert_eq!(registrations[0]["id"], "storage-1");
        assert_eq!(registrations[0]["contentType"], "text/css");
        assert_eq!(registrations[2]["path"], "index.html");

        let statuses = statuses(&events);
        assert!(statuses.contains(&"Building for hosting...".to_string()));
        assert!(statuses.contains(&"Unknown file type .png for logo.png, skipping".to_string()));
        // reserve and register output reaches the caller too
        assert!(statuses.contains(&"\"https://storage.test/upload/1\"".to_string()));
        assert_eq!(statuses.iter().filter(|s| *s == "null").count(), 3);

        // one reservation per uploadable file, none for the skipped one
        let reservations = harness
            .runner
            .commands()
            .iter()
            .filter(|c| c.ends_with("assets:startUpload"))
            .count();
        assert_eq!(reservations, 3);
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_names_asset() {
        let mut harness = Harness::new(Project::with_build());
        harness.storage = Arc::new(RecordingStorage::failing());

        let (result, events) = harness.run(request()).await;

        match result {
            Err(PipelineError::AssetUpload { path, .. }) => assert_eq!(path, "assets/app.css"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_single_terminal(&events);
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_build_skipped_without_script() {
        let harness = Harness::new(Project::backend_only());
        harness.run(request()).await.0.unwrap();

        assert!(harness.storage.uploads().is_empty());
        assert!(!harness.runner.commands().iter().any(|c| c.contains("oneclick-build")));
    }

    #[tokio::test]
    async fn test_missing_identifier_fails() {
        let harness = Harness::new(Project::backend_only().without_env_file());
        let (result, events) = harness.run(request()).await;

        assert!(matches!(result, Err(PipelineError::IdentifierResolution(_))));
        assert_single_terminal(&events);
    }

    #[tokio::test]
    async fn test_project_path_selects_subdirectory() {
        let harness = Harness::new(Project::backend_only().in_subdirectory("apps/web"));
        let mut req = request();
        req.project_path = Some("apps/web".to_string());

        assert_eq!(harness.run(req).await.0.unwrap(), "happy-otter-123");
        let install = harness
            .runner
            .specs()
            .into_iter()
            .find(|s| s.has_arg("install"))
            .unwrap();
        assert!(install.cwd.unwrap().ends_with("chat-app/apps/web"));
    }

    #[tokio::test]
    async fn test_missing_project_path_fails() {
        let harness = Harness::new(Project::backend_only());
        let mut req = request();
        req.project_path = Some("apps/missing".to_string());

        let (result, _) = harness.run(req).await;
        assert!(matches!(result, Err(PipelineError::ProjectPathNotFound(_))));
    }

    #[tokio::test]
    async fn test_project_prefix_applied() {
        let mut harness = Harness::new(Project::backend_only());
        harness.config.project_prefix = "demo-".to_string();
        harness.run(request()).await.0.unwrap();

        assert!(harness
            .runner
            .commands()
            .iter()
            .any(|c| c.ends_with("--project demo-chat-app")));
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_error_and_cleans_up() {
        let harness = Harness::new(Project::backend_only());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (result, events) = harness
            .run_observed(request(), Arc::new(NoopObserver), cancel)
            .await;

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_single_terminal(&events);
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let mut harness = Harness::new(Project::backend_only());
        harness.config.command_timeout = Some(Duration::from_millis(50));
        harness.runner.hang_on("install");

        let (result, events) = harness.run(request()).await;
        assert!(matches!(result, Err(PipelineError::Timeout { .. })));
        assert_single_terminal(&events);
    }

    #[derive(Default)]
    struct RecordingObserver {
        finished: Mutex<Vec<(Stage, bool)>>,
        outcome: Mutex<Option<std::result::Result<String, String>>>,
    }

    impl StageObserver for RecordingObserver {
        fn stage_finished(&self, stage: Stage, error: Option<&PipelineError>, _elapsed: Duration) {
            self.finished.lock().unwrap().push((stage, error.is_none()));
        }

        fn run_finished(
            &self,
            outcome: std::result::Result<&str, &PipelineError>,
            _elapsed: Duration,
        ) {
            *self.outcome.lock().unwrap() =
                Some(outcome.map(str::to_string).map_err(|e| e.to_string()));
        }
    }

    #[tokio::test]
    async fn test_broken_manifest_fails_install_stage() {
        let harness = Harness::new(Project::backend_only().with_broken_manifest());
        let observer = Arc::new(RecordingObserver::default());

        let (result, events) = harness
            .run_observed(request(), observer.clone(), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PipelineError::InvalidManifest(_))));
        assert_single_terminal(&events);
        assert!(statuses(&events).contains(&"Installing dependencies...".to_string()));
        assert_eq!(
            observer.finished.lock().unwrap().last(),
            Some(&(Stage::Install, false))
        );
        assert!(!harness.runner.commands().iter().any(|c| c.contains("--version")));
        assert!(harness.workspace_root_is_empty());
    }

    #[tokio::test]
    async fn test_observer_sees_stage_transitions() {
        let harness = Harness::new(Project::backend_only());
        harness.runner.fail_on("install", 2);
        let observer = Arc::new(RecordingObserver::default());

        harness
            .run_observed(request(), observer.clone(), CancellationToken::new())
            .await;

        assert_eq!(
            *observer.finished.lock().unwrap(),
            vec![
                (Stage::Authenticate, true),
                (Stage::Clone, true),
                (Stage::Install, false)
            ]
        );
        assert!(matches!(*observer.outcome.lock().unwrap(), Some(Err(_))));
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_separate_workspaces() {
        let harness = Harness::new(Project::backend_only());
        let (a, b) = tokio::join!(harness.run(request()), harness.run(request()));

        assert!(a.0.is_ok() && b.0.is_ok());
        let clones: Vec<String> = harness
            .runner
            .commands()
            .into_iter()
            .filter(|c| c.starts_with("git clone"))
            .collect();
        assert_eq!(clones.len(), 2);
        assert_ne!(clones[0], clones[1]);
        assert!(harness.workspace_root_is_empty());
    }
}
