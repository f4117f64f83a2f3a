use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for procbridge.
///
/// The variants callers are expected to branch on are `ExecutableNotFound`
/// (tool absent, actionable by the user), `Timeout` (the process was
/// forcibly terminated after exceeding its bound) and `CommandFailed`
/// (tool ran but reported failure; its stderr is attached).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("executable not found: {name} (attempted: {attempted})")]
    ExecutableNotFound { name: String, attempted: PathBuf },

    #[error("'{command}' timed out after {timeout:?} and was terminated")]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' failed with exit code {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no usable shell found: {0}")]
    ShellNotFound(String),

    #[error("PTY session error: {0}")]
    Session(String),

    #[error("telemetry worker error: {0}")]
    Worker(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),
}

/// Result type alias for procbridge.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn executable_not_found<S: Into<String>, P: Into<PathBuf>>(name: S, attempted: P) -> Self {
        BridgeError::ExecutableNotFound {
            name: name.into(),
            attempted: attempted.into(),
        }
    }

    pub fn timeout<S: Into<String>>(command: S, timeout: Duration) -> Self {
        BridgeError::Timeout {
            command: command.into(),
            timeout,
        }
    }

    pub fn command_failed<S: Into<String>>(
        command: S,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        BridgeError::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn parse<S: Into<String>, D: Into<String>>(what: S, detail: D) -> Self {
        BridgeError::Parse {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        BridgeError::Config(msg.into())
    }

    pub fn session<S: Into<String>>(msg: S) -> Self {
        BridgeError::Session(msg.into())
    }

    pub fn worker<S: Into<String>>(msg: S) -> Self {
        BridgeError::Worker(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        BridgeError::GpuNotAvailable(msg.into())
    }

    /// True when the underlying tool is missing entirely, as opposed to
    /// present but failing. Upstream UIs use this to prompt for a path.
    pub fn is_executable_not_found(&self) -> bool {
        matches!(self, BridgeError::ExecutableNotFound { .. })
    }
}
