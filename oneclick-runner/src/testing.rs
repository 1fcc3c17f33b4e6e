//! Test doubles for pipeline tests
//!
//! [`ScriptedRunner`] plays the external tools against a temporary
//! filesystem: cloning materializes a small project, the build script writes
//! a `dist/` tree, and the deployment CLI answers with canned output.

use async_trait::async_trait;
use oneclick_client::ClientError;
use oneclick_core::domain::token::AccessToken;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::command::{CommandRunner, CommandSpec, RunningCommand};
use crate::error::Result;
use crate::services::{AssetStorage, CredentialExchange};

/// Shape of the repository produced by the fake clone
#[derive(Debug, Clone)]
pub struct Project {
    build_script: bool,
    broken_manifest: bool,
    env_file: bool,
    subdirectory: Option<String>,
}

impl Project {
    pub fn backend_only() -> Self {
        Self {
            build_script: false,
            broken_manifest: false,
            env_file: true,
            subdirectory: None,
        }
    }

    pub fn with_build() -> Self {
        Self {
            build_script: true,
            ..Self::backend_only()
        }
    }

    /// `package.json` is not valid JSON
    pub fn with_broken_manifest(mut self) -> Self {
        self.broken_manifest = true;
        self
    }

    /// The deploy step writes no env file
    pub fn without_env_file(mut self) -> Self {
        self.env_file = false;
        self
    }

    /// The project lives in `path` inside the repository
    pub fn in_subdirectory(mut self, path: &str) -> Self {
        self.subdirectory = Some(path.to_string());
        self
    }

    fn materialize(&self, checkout: &Path) {
        let dir = match &self.subdirectory {
            Some(sub) => checkout.join(sub),
            None => checkout.to_path_buf(),
        };
        std::fs::create_dir_all(&dir).unwrap();

        let manifest = if self.broken_manifest {
            r#"{"name":"chat-app","scripts":"#
        } else if self.build_script {
            r#"{"name":"chat-app","scripts":{"dev":"vite","oneclick-build":"vite build"}}"#
        } else {
            r#"{"name":"chat-app","scripts":{"dev":"vite"}}"#
        };
        std::fs::write(dir.join("package.json"), manifest).unwrap();
    }
}

#[derive(Default)]
struct Behaviour {
    cli_version: Option<String>,
    failures: HashMap<String, i32>,
    hangs: Vec<String>,
}

/// Fake [`CommandRunner`] recording every spawned command
pub struct ScriptedRunner {
    project: Project,
    behaviour: Mutex<Behaviour>,
    specs: Mutex<Vec<CommandSpec>>,
    reservations: AtomicUsize,
    credentials: Mutex<Option<String>>,
}

impl ScriptedRunner {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            behaviour: Mutex::new(Behaviour::default()),
            specs: Mutex::new(Vec::new()),
            reservations: AtomicUsize::new(0),
            credentials: Mutex::new(None),
        }
    }

    /// Commands containing `arg` exit with `code`
    pub fn fail_on(&self, arg: &str, code: i32) {
        self.behaviour
            .lock()
            .unwrap()
            .failures
            .insert(arg.to_string(), code);
    }

    /// Commands containing `arg` never finish
    pub fn hang_on(&self, arg: &str) {
        self.behaviour.lock().unwrap().hangs.push(arg.to_string());
    }

    pub fn set_cli_version(&self, version: &str) {
        self.behaviour.lock().unwrap().cli_version = Some(version.to_string());
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// Displayed form of every command, in spawn order
    pub fn commands(&self) -> Vec<String> {
        self.specs().iter().map(CommandSpec::display).collect()
    }

    /// Payloads passed to `assets:uploadAsset`
    pub fn registrations(&self) -> Vec<serde_json::Value> {
        self.specs()
            .iter()
            .filter(|s| s.has_arg("assets:uploadAsset"))
            .filter_map(|s| s.args.last())
            .map(|payload| serde_json::from_str(payload).unwrap())
            .collect()
    }

    /// Credentials file contents as seen by the deploy command
    pub fn credentials_seen(&self) -> Option<String> {
        self.credentials.lock().unwrap().clone()
    }

    fn respond(&self, spec: &CommandSpec) -> Vec<String> {
        let cwd = spec.cwd.clone().unwrap_or_default();

        if spec.has_arg("clone") {
            let dest = PathBuf::from(spec.args.last().cloned().unwrap_or_default());
            let name = dest.file_name().unwrap().to_string_lossy().to_string();
            self.project.materialize(&dest);
            return vec![format!("Cloning into '{}'...", name)];
        }
        if spec.has_arg("install") {
            return vec!["bun install v1.1.0".to_string(), "42 packages installed".to_string()];
        }
        if spec.has_arg("--version") {
            let version = self.behaviour.lock().unwrap().cli_version.clone();
            return vec![version.unwrap_or_else(|| "1.17.4".to_string())];
        }
        if spec.has_arg("dev") {
            if let Some((_, home)) = spec.env.iter().find(|(k, _)| k == "HOME") {
                let file = Path::new(home).join(".convex/config.json");
                *self.credentials.lock().unwrap() = std::fs::read_to_string(file).ok();
            }
            if self.project.env_file {
                std::fs::write(
                    cwd.join(".env.local"),
                    "CONVEX_DEPLOYMENT=dev:happy-otter-123 # team: acme\n\
                     VITE_CONVEX_URL=https://happy-otter-123.convex.cloud\n",
                )
                .unwrap();
            }
            return vec!["✔ Provisioned a dev deployment".to_string()];
        }
        if spec.has_arg("oneclick-build") {
            let dist = cwd.join("dist");
            std::fs::create_dir_all(dist.join("assets")).unwrap();
            std::fs::write(dist.join("index.html"), "<html></html>").unwrap();
            std::fs::write(dist.join("assets/app.js"), "console.log(1)").unwrap();
            std::fs::write(dist.join("assets/app.css"), "a{}").unwrap();
            std::fs::write(dist.join("logo.png"), b"\x89PNG").unwrap();
            return vec!["vite v5.0.0 building for production...".to_string()];
        }
        if spec.has_arg("assets:startUpload") {
            let n = self.reservations.fetch_add(1, Ordering::SeqCst) + 1;
            return vec![format!("\"https://storage.test/upload/{}\"", n)];
        }
        if spec.has_arg("assets:uploadAsset") {
            return vec!["null".to_string()];
        }
        Vec::new()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningCommand>> {
        self.specs.lock().unwrap().push(spec.clone());

        let (exit_code, hangs) = {
            let behaviour = self.behaviour.lock().unwrap();
            let exit_code = behaviour
                .failures
                .iter()
                .find(|(arg, _)| spec.has_arg(arg))
                .map(|(_, code)| *code)
                .unwrap_or(0);
            let hangs = behaviour.hangs.iter().any(|arg| spec.has_arg(arg));
            (exit_code, hangs)
        };

        let lines = if exit_code == 0 {
            self.respond(spec)
        } else {
            vec!["error: something went wrong".to_string()]
        };

        Ok(Box::new(ScriptedCommand {
            lines: lines.into(),
            exit_code,
            hangs,
        }))
    }
}

struct ScriptedCommand {
    lines: VecDeque<String>,
    exit_code: i32,
    hangs: bool,
}

#[async_trait]
impl RunningCommand for ScriptedCommand {
    async fn next_line(&mut self) -> Option<String> {
        if self.hangs {
            std::future::pending::<()>().await;
        }
        self.lines.pop_front()
    }

    async fn wait(self: Box<Self>) -> Result<Option<i32>> {
        Ok(Some(self.exit_code))
    }
}

/// Fake [`CredentialExchange`]
pub struct FakeExchange {
    failure_status: Option<u16>,
    token: String,
    calls: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl FakeExchange {
    pub fn ok(token: &str) -> Self {
        Self {
            failure_status: None,
            token: token.to_string(),
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..Self::ok("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialExchange for FakeExchange {
    async fn exchange(
        &self,
        provision_url: &str,
        _auth_token: &str,
    ) -> std::result::Result<AccessToken, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(provision_url.to_string());
        match self.failure_status {
            Some(status) => Err(ClientError::api_error(status, "Invalid auth token")),
            None => Ok(AccessToken::new(self.token.clone())),
        }
    }
}

/// Fake [`AssetStorage`] keeping `(url, content type, contents)` per upload
#[derive(Default)]
pub struct RecordingStorage {
    fail: bool,
    uploads: Mutex<Vec<(String, String, String)>>,
}

impl RecordingStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<(String, String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStorage for RecordingStorage {
    async fn upload(
        &self,
        upload_url: &str,
        content_type: &str,
        contents: Vec<u8>,
    ) -> std::result::Result<String, ClientError> {
        if self.fail {
            return Err(ClientError::api_error(500, "storage unavailable"));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((
            upload_url.to_string(),
            content_type.to_string(),
            String::from_utf8_lossy(&contents).to_string(),
        ));
        Ok(format!("storage-{}", uploads.len()))
    }
}
