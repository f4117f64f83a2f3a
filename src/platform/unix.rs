//! Unix (Linux/macOS) platform strategy.

use std::path::PathBuf;

use crate::core::telemetry::CpuMetricUnit;

use super::{Platform, ShellCandidate};

pub struct UnixPlatform;

impl Platform for UnixPlatform {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn shell_candidates(&self) -> Vec<ShellCandidate> {
        let mut candidates = Vec::new();

        // The user's login shell first, when the environment names one.
        if let Ok(shell) = std::env::var("SHELL") {
            if !shell.is_empty() {
                candidates.push(ShellCandidate::new(shell, &[], &["-c", "exit 0"]));
            }
        }

        candidates.push(ShellCandidate::new("zsh", &[], &["-c", "exit 0"]));
        candidates.push(ShellCandidate::new("bash", &[], &["-c", "exit 0"]));
        candidates.push(ShellCandidate::new("sh", &[], &["-c", "exit 0"]));
        candidates
    }

    fn line_ending(&self) -> &'static str {
        "\n"
    }

    fn quote_arg(&self, arg: &str) -> String {
        if arg.is_empty() {
            return "''".to_string();
        }
        let safe = arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':'));
        if safe {
            arg.to_string()
        } else {
            // POSIX single-quoting: close, escape the quote, reopen.
            format!("'{}'", arg.replace('\'', r"'\''"))
        }
    }

    fn sdk_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
            if let Ok(dir) = std::env::var(var) {
                if !dir.is_empty() {
                    roots.push(PathBuf::from(dir));
                }
            }
        }
        if let Some(home) = dirs::home_dir() {
            // macOS and Linux conventional install locations.
            roots.push(home.join("Library").join("Android").join("sdk"));
            roots.push(home.join("Android").join("Sdk"));
        }
        roots
    }

    fn adb_binary_name(&self) -> &'static str {
        "adb"
    }

    fn legacy_encoding(&self) -> Option<&'static encoding_rs::Encoding> {
        None
    }

    fn process_cpu_unit(&self) -> CpuMetricUnit {
        CpuMetricUnit::Percent
    }
}
