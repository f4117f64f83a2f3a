//! Interactive PTY session management.
//!
//! A session binds one spawned shell process to one owning UI surface. The
//! manager owns the registry of live sessions; sessions are created with
//! replace semantics (a reused id force-closes its predecessor), written to
//! and resized best-effort, and torn down either explicitly, when the
//! process exits on its own, or implicitly when the owning surface is gone.

mod manager;

use std::path::PathBuf;

pub use manager::PtySessionManager;

/// What kind of session is being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// A long-lived interactive shell.
    #[default]
    Interactive,
    /// Runs the initial command, then exits on its own: an `exit` command
    /// is injected right after the task's command line.
    OneShotTask,
    /// An interactive session whose initial command is an ssh invocation;
    /// lifecycle is identical to `Interactive`.
    Ssh,
}

/// The command injected into a fresh session as literal keystrokes.
///
/// Arguments are quoted individually per the platform rule before being
/// joined; this is the one sanctioned exception to argv-only spawning.
#[derive(Debug, Clone)]
pub struct InitialCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl InitialCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Options for [`PtySessionManager::create_session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Caller-supplied id, unique per surface. Reusing a live id replaces
    /// the previous session instead of erroring.
    pub id: String,
    pub mode: SessionMode,
    /// Preferred shell name/path; `None` takes the platform default chain.
    pub shell: Option<String>,
    pub initial_command: Option<InitialCommand>,
    /// Defaults to the host's current working directory.
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
}

impl SessionOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: SessionMode::Interactive,
            shell: None,
            initial_command: None,
            cwd: None,
            env: Vec::new(),
            cols: 100,
            rows: 30,
        }
    }

    pub fn mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn initial_command(mut self, command: InitialCommand) -> Self {
        self.initial_command = Some(command);
        self
    }
}

/// The UI surface owning a session. The manager holds it weakly and checks
/// liveness before every push: output delivered to a destroyed surface is
/// undefined behavior in most UI toolkits, so a dead surface triggers an
/// implicit close instead.
pub trait SessionSurface: Send + Sync {
    /// Raw PTY output for the given session.
    fn on_output(&self, session_id: &str, data: &[u8]);
    /// The session's process exited on its own. `None` means the exit code
    /// could not be determined.
    fn on_exit(&self, session_id: &str, exit_code: Option<u32>);
}
