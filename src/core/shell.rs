//! Shell and tool-binary resolution.
//!
//! Two jobs: pick a usable interactive shell for PTY sessions, and locate
//! required external binaries (adb, PowerShell variants). Both kinds of
//! lookup are expensive filesystem/spawn probes, so results (including
//! negative ones) are cached for the process lifetime, with an explicit
//! reset for callers that change their environment at runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::core::process::{self, ProcessSpec};
use crate::error::{BridgeError, Result};
use crate::platform::{self, Platform, ShellCandidate};

/// How long a no-op usability probe may run before the candidate is
/// considered broken.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// A resolved interactive shell, ready to hand to the PTY layer.
///
/// Besides the executable and its invocation arguments this carries the
/// platform's line terminator and quoting rule: a PTY session injects a
/// command line as literal keystrokes, not as argv, so the caller needs
/// both to build that line correctly.
#[derive(Clone)]
pub struct ResolvedShell {
    pub executable: PathBuf,
    pub invocation_args: Vec<String>,
    pub line_ending: &'static str,
    platform: &'static dyn Platform,
}

impl std::fmt::Debug for ResolvedShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedShell")
            .field("executable", &self.executable)
            .field("invocation_args", &self.invocation_args)
            .field("line_ending", &self.line_ending)
            .finish()
    }
}

impl ResolvedShell {
    /// Quote one argument per the platform's rule.
    pub fn quote_arg(&self, arg: &str) -> String {
        self.platform.quote_arg(arg)
    }

    /// Build a full literal command line (program + individually quoted
    /// arguments), without the trailing line terminator.
    pub fn command_line(&self, program: &str, args: &[String]) -> String {
        let mut parts = vec![self.quote_arg(program)];
        parts.extend(args.iter().map(|a| self.quote_arg(a)));
        parts.join(" ")
    }
}

/// Resolver for interactive shells and required tool binaries.
pub struct ShellResolver {
    platform: &'static dyn Platform,
    shell_cache: Mutex<HashMap<String, ResolvedShell>>,
    locate_cache: RwLock<HashMap<String, Option<PathBuf>>>,
}

impl ShellResolver {
    pub fn new() -> Self {
        Self::with_platform(platform::current())
    }

    pub fn with_platform(platform: &'static dyn Platform) -> Self {
        Self {
            platform,
            shell_cache: Mutex::new(HashMap::new()),
            locate_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an interactive shell, honoring an explicit caller preference
    /// before falling back to the platform's candidate list.
    ///
    /// Each candidate is probed by actually spawning it with a no-op
    /// command under a short timeout; a binary that exists on disk but
    /// cannot execute is skipped.
    pub async fn resolve(&self, preferred: Option<&str>) -> Result<ResolvedShell> {
        let cache_key = preferred.unwrap_or_default().to_string();
        if let Some(cached) = self.shell_cache.lock().get(&cache_key) {
            return Ok(cached.clone());
        }

        let mut candidates = Vec::new();
        if let Some(name) = preferred {
            candidates.push(self.candidate_for(name));
        }
        candidates.extend(self.platform.shell_candidates());

        let mut tried = Vec::new();
        for candidate in candidates {
            tried.push(candidate.program.clone());
            let Some(path) = self.locate(&candidate.program) else {
                continue;
            };
            if !self.probe(&path, &candidate.probe_args).await {
                log::warn!(
                    "shell candidate {} found at {} but failed its usability probe",
                    candidate.program,
                    path.display()
                );
                continue;
            }
            let resolved = ResolvedShell {
                executable: path,
                invocation_args: candidate.invocation_args,
                line_ending: self.platform.line_ending(),
                platform: self.platform,
            };
            self.shell_cache.lock().insert(cache_key, resolved.clone());
            return Ok(resolved);
        }

        Err(BridgeError::ShellNotFound(format!(
            "tried: {}",
            tried.join(", ")
        )))
    }

    /// Locate a tool binary: absolute/relative paths are checked on disk,
    /// bare names are searched on PATH. Results (positive and negative)
    /// are cached until [`reset_cache`](Self::reset_cache).
    pub fn locate(&self, binary: &str) -> Option<PathBuf> {
        if let Some(cached) = self.locate_cache.read().get(binary) {
            return cached.clone();
        }

        let resolved = if is_path_like(binary) {
            let path = PathBuf::from(binary);
            path.exists().then_some(path)
        } else {
            which::which(binary).ok()
        };

        self.locate_cache
            .write()
            .insert(binary.to_string(), resolved.clone());
        resolved
    }

    /// Drop all cached resolutions, positive and negative. For callers who
    /// change PATH or install a tool at runtime.
    pub fn reset_cache(&self) {
        self.shell_cache.lock().clear();
        self.locate_cache.write().clear();
    }

    /// Build a candidate for an explicitly preferred shell. When the name
    /// matches a known platform candidate its arguments are reused;
    /// otherwise the platform's most generic probe form applies.
    fn candidate_for(&self, name: &str) -> ShellCandidate {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let platform_candidates = self.platform.shell_candidates();
        if let Some(known) = platform_candidates.iter().find(|c| c.program == stem) {
            return ShellCandidate {
                program: name.to_string(),
                invocation_args: known.invocation_args.clone(),
                probe_args: known.probe_args.clone(),
            };
        }
        let generic_probe = platform_candidates
            .last()
            .map(|c| c.probe_args.clone())
            .unwrap_or_default();
        ShellCandidate {
            program: name.to_string(),
            invocation_args: Vec::new(),
            probe_args: generic_probe,
        }
    }

    async fn probe(&self, path: &Path, probe_args: &[String]) -> bool {
        let spec = ProcessSpec::new(path)
            .args(probe_args.iter().cloned())
            .timeout(PROBE_TIMEOUT);
        match process::run(&spec).await {
            Ok(result) => result.success(),
            Err(_) => false,
        }
    }
}

impl Default for ShellResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_path_like(binary: &str) -> bool {
    binary.contains('/') || binary.contains('\\')
}
