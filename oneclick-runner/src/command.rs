//! External command execution
//!
//! Commands are described by [`CommandSpec`] and launched through the
//! [`CommandRunner`] trait, which exposes the merged stdout/stderr of the
//! process as trimmed lines. [`CommandExecutor`] layers the per-command
//! timeout, run cancellation and exit-status checking on top.
//!
//! Arguments are always passed as a vector, never through a shell.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::events::EventSink;

/// Description of one process invocation
#[derive(Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// Indexes into `args` that must never be displayed
    pub redacted_args: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an argument that is replaced by `***` in [`CommandSpec::display`]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.redacted_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, vars: &[(String, String)]) -> Self {
        self.env.extend(vars.iter().cloned());
        self
    }

    /// Whether `arg` appears among the arguments
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Program and arguments as shown in logs and error messages
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        for (i, arg) in self.args.iter().enumerate() {
            if self.redacted_args.contains(&i) {
                parts.push("***");
            } else {
                parts.push(arg.as_str());
            }
        }
        parts.join(" ")
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("cwd", &self.cwd)
            .field("env", &env_keys)
            .finish()
    }
}

// =============================================================================
// Runner Seam
// =============================================================================

/// Launches processes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Starts the command; output is available through the returned handle
    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningCommand>>;
}

/// A started process
#[async_trait]
pub trait RunningCommand: Send {
    /// Next trimmed, non-empty output line; `None` once both streams closed
    async fn next_line(&mut self) -> Option<String>;

    /// Waits for the process to exit and returns its exit code
    ///
    /// `None` means the process was terminated without one.
    async fn wait(self: Box<Self>) -> Result<Option<i32>>;
}

/// [`CommandRunner`] backed by real OS processes
///
/// Children are killed when their handle is dropped, so abandoning a run
/// (timeout, cancellation, panic) never leaves a process behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningCommand>> {
        debug!("Spawning {:?}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel(256);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx));
        }

        Ok(Box::new(ProcessHandle { child, lines: rx }))
    }
}

struct ProcessHandle {
    child: Child,
    lines: mpsc::Receiver<String>,
}

#[async_trait]
impl RunningCommand for ProcessHandle {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn wait(mut self: Box<Self>) -> Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

/// Reads a pipe line by line until EOF
///
/// Invalid UTF-8 is replaced rather than ending the stream.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        }
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Runs commands on behalf of one deployment
#[derive(Clone)]
pub struct CommandExecutor {
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CommandExecutor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runner,
            timeout,
            cancel,
        }
    }

    /// Runs the command, forwarding each output line as a status event
    pub async fn stream(&self, spec: &CommandSpec, sink: &EventSink) -> Result<()> {
        self.drive(spec, Some(sink), false).await.map(|_| ())
    }

    /// Runs the command and returns its output lines
    ///
    /// Lines are also forwarded when a sink is given.
    pub async fn capture(&self, spec: &CommandSpec, sink: Option<&EventSink>) -> Result<Vec<String>> {
        self.drive(spec, sink, true).await
    }

    async fn drive(
        &self,
        spec: &CommandSpec,
        sink: Option<&EventSink>,
        keep: bool,
    ) -> Result<Vec<String>> {
        let work = async {
            let mut handle = self.runner.spawn(spec).await?;
            let mut captured = Vec::new();

            while let Some(line) = handle.next_line().await {
                if let Some(sink) = sink {
                    sink.line(&line).await?;
                }
                if keep {
                    captured.push(line);
                }
            }

            match handle.wait().await? {
                Some(0) => Ok(captured),
                exit_code => Err(PipelineError::CommandFailed {
                    command: spec.display(),
                    exit_code,
                }),
            }
        };

        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::Timeout {
                        command: spec.display(),
                        after: limit,
                    }),
                },
                None => work.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = bounded => result,
        }
    }
}
