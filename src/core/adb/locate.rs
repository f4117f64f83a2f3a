use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::shell::ShellResolver;
use crate::platform;

/// Locates the adb executable.
///
/// Resolution order: explicit configured path, a project-local
/// `platform-tools/` directory, then `platform-tools/` under each SDK
/// root reported by the platform (environment variables first, then
/// conventional install locations), then a PATH lookup. Path-like
/// candidates are only accepted when they exist on disk. The bare
/// command name is returned as a last resort so the existence check is
/// deferred to spawn time, where a missing binary surfaces as
/// `BridgeError::ExecutableNotFound`.
pub fn locate_adb(config: &Config, resolver: &ShellResolver) -> PathBuf {
    if let Some(configured) = &config.adb_path {
        let path = PathBuf::from(configured);
        if path.exists() {
            return path;
        }
        log::warn!(
            "configured adb path does not exist, falling back to discovery: {}",
            path.display()
        );
    }

    let platform = platform::current();
    let binary = platform.adb_binary_name();

    let local = PathBuf::from("platform-tools").join(binary);
    if local.exists() {
        return local;
    }

    for root in platform.sdk_roots() {
        let candidate = root.join("platform-tools").join(binary);
        if candidate.exists() {
            return candidate;
        }
    }

    match resolver.locate(binary) {
        Some(found) => found,
        None => PathBuf::from(binary),
    }
}
