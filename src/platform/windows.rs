//! Windows platform strategy.

use std::path::PathBuf;

use crate::core::telemetry::CpuMetricUnit;

use super::{Platform, ShellCandidate};

pub struct WindowsPlatform;

fn env_dir(var: &str) -> Option<PathBuf> {
    match std::env::var(var) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => None,
    }
}

impl Platform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn shell_candidates(&self) -> Vec<ShellCandidate> {
        // PowerShell 7+ first, then Windows PowerShell, then cmd. Both
        // PowerShell variants are probed by actually running a no-op
        // command: a broken pwsh install can be present but unusable.
        // Each bare name (resolved via PATH) is followed by its well-known
        // install path; a zip or per-user pwsh install may not be on PATH.
        const PS_INVOKE: &[&str] = &["-NoLogo"];
        const PS_PROBE: &[&str] = &["-NoProfile", "-NonInteractive", "-Command", "exit 0"];
        const CMD_PROBE: &[&str] = &["/C", "exit 0"];

        let mut candidates = vec![ShellCandidate::new("pwsh", PS_INVOKE, PS_PROBE)];
        if let Some(program_files) = env_dir("ProgramFiles") {
            candidates.push(ShellCandidate::new(
                program_files
                    .join("PowerShell")
                    .join("7")
                    .join("pwsh.exe")
                    .to_string_lossy(),
                PS_INVOKE,
                PS_PROBE,
            ));
        }
        candidates.push(ShellCandidate::new("powershell", PS_INVOKE, PS_PROBE));
        let system32 = env_dir("SystemRoot").map(|root| root.join("System32"));
        if let Some(system32) = &system32 {
            candidates.push(ShellCandidate::new(
                system32
                    .join("WindowsPowerShell")
                    .join("v1.0")
                    .join("powershell.exe")
                    .to_string_lossy(),
                PS_INVOKE,
                PS_PROBE,
            ));
        }
        candidates.push(ShellCandidate::new("cmd", &[], CMD_PROBE));
        if let Some(system32) = &system32 {
            candidates.push(ShellCandidate::new(
                system32.join("cmd.exe").to_string_lossy(),
                &[],
                CMD_PROBE,
            ));
        }
        candidates
    }

    fn line_ending(&self) -> &'static str {
        "\r\n"
    }

    fn quote_arg(&self, arg: &str) -> String {
        if arg.is_empty() {
            return "\"\"".to_string();
        }
        let safe = arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '\\' | '/' | ':'));
        if safe {
            arg.to_string()
        } else {
            // PowerShell-style double quoting; embedded quotes are doubled.
            format!("\"{}\"", arg.replace('"', "\"\""))
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
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            if !local.is_empty() {
                roots.push(PathBuf::from(local).join("Android").join("Sdk"));
            }
        }
        roots
    }

    fn adb_binary_name(&self) -> &'static str {
        "adb.exe"
    }

    fn legacy_encoding(&self) -> Option<&'static encoding_rs::Encoding> {
        // Console tools predating UTF-8 codepages emit the ANSI codepage;
        // Windows-1252 covers the common western installs.
        Some(encoding_rs::WINDOWS_1252)
    }

    fn process_cpu_unit(&self) -> CpuMetricUnit {
        CpuMetricUnit::CumulativeSeconds
    }
}
