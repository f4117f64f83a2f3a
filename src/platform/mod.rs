// Platform-specific behavior, selected once at startup.

pub mod gpu;
mod unix;
mod windows;

use std::path::PathBuf;

use crate::core::telemetry::CpuMetricUnit;

pub use unix::UnixPlatform;
pub use windows::WindowsPlatform;

/// A shell the resolver may try, most preferred first.
#[derive(Debug, Clone)]
pub struct ShellCandidate {
    /// Program name or absolute path.
    pub program: String,
    /// Arguments used when spawning the shell interactively.
    pub invocation_args: Vec<String>,
    /// Arguments for a no-op run used to probe that the interpreter
    /// actually executes (presence on disk does not imply executability).
    pub probe_args: Vec<String>,
}

impl ShellCandidate {
    pub fn new(program: impl Into<String>, invocation: &[&str], probe: &[&str]) -> Self {
        Self {
            program: program.into(),
            invocation_args: invocation.iter().map(|s| s.to_string()).collect(),
            probe_args: probe.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Strategy interface for everything that differs per OS.
///
/// One implementation exists per platform and is selected exactly once via
/// [`current`]; callers never branch on `cfg!(target_os)` themselves.
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Interactive shells to try, in order of preference.
    fn shell_candidates(&self) -> Vec<ShellCandidate>;

    /// Line terminator appended after a command line injected into a PTY.
    fn line_ending(&self) -> &'static str;

    /// Quote a single argument for literal injection into a PTY command
    /// line. This is the one place where arguments are concatenated into a
    /// string instead of passed as argv.
    fn quote_arg(&self, arg: &str) -> String;

    /// Candidate Android SDK roots (each may contain `platform-tools/`).
    fn sdk_roots(&self) -> Vec<PathBuf>;

    /// File name of the adb binary on this platform.
    fn adb_binary_name(&self) -> &'static str;

    /// Legacy console encoding to re-decode process output with when UTF-8
    /// decoding produces replacement characters. `None` means UTF-8 only.
    fn legacy_encoding(&self) -> Option<&'static encoding_rs::Encoding>;

    /// Unit of the per-process CPU metric reported by [`crate::core::telemetry`].
    fn process_cpu_unit(&self) -> CpuMetricUnit;
}

/// The platform strategy for the current OS.
pub fn current() -> &'static dyn Platform {
    #[cfg(windows)]
    {
        static PLATFORM: WindowsPlatform = WindowsPlatform;
        &PLATFORM
    }
    #[cfg(not(windows))]
    {
        static PLATFORM: UnixPlatform = UnixPlatform;
        &PLATFORM
    }
}
