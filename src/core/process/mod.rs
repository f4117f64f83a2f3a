//! Process spawning primitive.
//!
//! Everything in this crate that touches an external OS process funnels
//! through [`run`] or [`run_streaming`]. Commands are spawned argv-style,
//! never through a shell, so caller-supplied strings (device ids, filter
//! expressions) are never subject to metacharacter expansion. The single
//! deliberate exception is PTY command injection, which lives in
//! [`crate::core::pty`] and applies per-argument quoting.

pub mod decode;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use crate::error::{BridgeError, Result};

pub use decode::{decode_console, decode_with_fallback};

/// How captured stdout should be handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Decode as text (UTF-8 with legacy-encoding fallback).
    #[default]
    Text,
    /// Return raw bytes untouched (screenshot capture must not be run
    /// through any text decoding).
    Binary,
}

/// Specification of one external process invocation. Immutable once passed
/// to [`run`]; construct with the builder methods.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    executable: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
    capture: CaptureMode,
}

impl ProcessSpec {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            timeout: None,
            capture: CaptureMode::Text,
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

    /// Defaults to the host's current working directory when unset.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Capture stdout as raw bytes instead of text.
    pub fn binary(mut self) -> Self {
        self.capture = CaptureMode::Binary;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Human-readable command line, for error messages and logs only.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.executable.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Captured stdout, in the representation the spec asked for.
#[derive(Debug, Clone)]
pub enum CapturedOutput {
    Text(String),
    Binary(Vec<u8>),
}

impl CapturedOutput {
    pub fn as_text(&self) -> &str {
        match self {
            CapturedOutput::Text(text) => text,
            CapturedOutput::Binary(_) => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CapturedOutput::Text(text) => text.as_bytes(),
            CapturedOutput::Binary(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CapturedOutput::Text(text) => text.into_bytes(),
            CapturedOutput::Binary(bytes) => bytes,
        }
    }
}

/// Outcome of a completed (or killed) process.
///
/// A `None` exit code means the process was killed or timed out. A non-zero
/// exit code is not an error here; callers decide whether it is.
#[derive(Debug)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub stdout: CapturedOutput,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    pub fn stdout_text(&self) -> &str {
        self.stdout.as_text()
    }
}

/// Run a process to completion, capturing stdout and stderr.
///
/// A missing executable is surfaced as [`BridgeError::ExecutableNotFound`]
/// (carrying the attempted path); a timeout kills the process and resolves
/// as [`BridgeError::Timeout`]. Non-zero exits come back as a normal
/// [`ProcessResult`].
pub async fn run(spec: &ProcessSpec) -> Result<ProcessResult> {
    let result = run_inner(spec).await?;
    if result.timed_out {
        return Err(BridgeError::timeout(
            spec.display_command(),
            spec.timeout.unwrap_or_default(),
        ));
    }
    Ok(result)
}

async fn run_inner(spec: &ProcessSpec) -> Result<ProcessResult> {
    let mut child = spec.build_command().spawn().map_err(|e| spawn_error(spec, e))?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let (status, timed_out) = match spec.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => (Some(status?), false),
            Err(_) => {
                // Timer expired: terminate unconditionally and reap.
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, true)
            }
        },
        None => (Some(child.wait().await?), false),
    };

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    let stdout = match spec.capture {
        CaptureMode::Text => CapturedOutput::Text(decode_console(&stdout_bytes)),
        CaptureMode::Binary => CapturedOutput::Binary(stdout_bytes),
    };

    Ok(ProcessResult {
        exit_code: status.and_then(|s| s.code()),
        stdout,
        stderr: decode_console(&stderr_bytes),
        timed_out,
    })
}

fn spawn_error(spec: &ProcessSpec, err: std::io::Error) -> BridgeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        BridgeError::executable_not_found(
            spec.executable.to_string_lossy(),
            spec.executable.clone(),
        )
    } else {
        BridgeError::Io(err)
    }
}

/// Event emitted by a streaming run.
#[derive(Debug)]
pub enum StreamEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exited {
        exit_code: Option<i32>,
        timed_out: bool,
    },
}

/// Handle to a process started with [`run_streaming`].
///
/// Dropping the handle does not kill the process; long-lived consumers call
/// [`StreamingChild::kill`] explicitly.
pub struct StreamingChild {
    pid: Option<u32>,
    events: mpsc::Receiver<StreamEvent>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl StreamingChild {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next output/exit event; `None` after `Exited` has been delivered.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Request termination. Idempotent; the `Exited` event still follows.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawn a process and stream its output as events instead of collecting it.
///
/// Used for long-lived invocations (e.g. following a device log) where the
/// caller wants chunks as they arrive. The spec's timeout, when set, still
/// bounds the total runtime.
pub async fn run_streaming(spec: &ProcessSpec) -> Result<StreamingChild> {
    let mut child = spec.build_command().spawn().map_err(|e| spawn_error(spec, e))?;
    let pid = child.id();

    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(64);
    let (kill_tx, kill_rx) = oneshot::channel::<()>();

    let mut stdout_pipe = child.stdout.take();
    let out_tx = event_tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        if let Some(pipe) = stdout_pipe.as_mut() {
            while let Ok(n) = pipe.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                if out_tx.send(StreamEvent::Stdout(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut stderr_pipe = child.stderr.take();
    let err_tx = event_tx.clone();
    let stderr_task = tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        if let Some(pipe) = stderr_pipe.as_mut() {
            while let Ok(n) = pipe.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                if err_tx.send(StreamEvent::Stderr(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    });

    let limit = spec.timeout;
    tokio::spawn(async move {
        let deadline = async {
            match limit {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        // A dropped kill sender must not read as a kill request.
        let kill_requested = async {
            match kill_rx.await {
                Ok(()) => (),
                Err(_) => std::future::pending().await,
            }
        };

        let (exit_code, timed_out) = tokio::select! {
            status = child.wait() => (status.ok().and_then(|s| s.code()), false),
            _ = kill_requested => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, false)
            }
            _ = deadline => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, true)
            }
        };

        // Drain remaining output before reporting exit.
        let _ = stdout_task.await;
        let _ = stderr_task.await;
        let _ = event_tx
            .send(StreamEvent::Exited {
                exit_code,
                timed_out,
            })
            .await;
    });

    Ok(StreamingChild {
        pid,
        events: event_rx,
        kill_tx: Some(kill_tx),
    })
}
