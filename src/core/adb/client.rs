use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::adb::devices::{parse_device_list, DeviceInfo};
use crate::core::adb::locate::locate_adb;
use crate::core::config::Config;
use crate::core::process::{self, ProcessResult, ProcessSpec, StreamingChild};
use crate::core::shell::ShellResolver;
use crate::error::{BridgeError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const GETPROP_TIMEOUT: Duration = Duration::from_secs(5);

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Runs adb subcommands against a located binary.
///
/// All invocations are argv-based; user-supplied arguments are passed
/// through as-is, never re-quoted or joined into a shell string.
pub struct AdbClient {
    executable: PathBuf,
}

impl AdbClient {
    /// Builds a client by walking the adb discovery chain.
    pub fn new(config: &Config, resolver: &ShellResolver) -> Self {
        let executable = locate_adb(config, resolver);
        log::debug!("using adb at {}", executable.display());
        AdbClient { executable }
    }

    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        AdbClient {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Prepends the `-s <id>` target selector when a device is given.
    fn device_args(device: Option<&str>, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(id) = device {
            full.push("-s".to_string());
            full.push(id.to_string());
        }
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    fn spec(&self, device: Option<&str>, args: &[&str], timeout: Duration) -> ProcessSpec {
        ProcessSpec::new(&self.executable)
            .args(Self::device_args(device, args))
            .timeout(timeout)
    }

    /// Runs a subcommand and requires a zero exit.
    async fn exec_checked(
        &self,
        device: Option<&str>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ProcessResult> {
        let spec = self.spec(device, args, timeout);
        let result = process::run(&spec).await?;
        if !result.success() {
            // adb reports some failures on stdout rather than stderr.
            let detail = if result.stderr.trim().is_empty() {
                result.stdout_text().trim().to_string()
            } else {
                result.stderr.trim().to_string()
            };
            return Err(BridgeError::command_failed(
                spec.display_command(),
                result.exit_code,
                detail,
            ));
        }
        Ok(result)
    }

    /// Verifies the binary responds, returning the first version line.
    pub async fn check(&self) -> Result<String> {
        let result = self
            .exec_checked(None, &["version"], Duration::from_secs(10))
            .await?;
        let version = result
            .stdout_text()
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(version)
    }

    /// Lists connected devices.
    ///
    /// Online devices are enriched with manufacturer and Android version
    /// read via `getprop`; enrichment failures are logged and leave the
    /// fields empty rather than failing the listing.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let result = self
            .exec_checked(None, &["devices", "-l"], DEFAULT_TIMEOUT)
            .await?;
        let mut devices = parse_device_list(result.stdout_text());

        for device in devices.iter_mut().filter(|d| d.is_online()) {
            device.manufacturer = self
                .read_prop(&device.id, "ro.product.manufacturer")
                .await;
            device.android_version = self
                .read_prop(&device.id, "ro.build.version.release")
                .await;
        }

        Ok(devices)
    }

    async fn read_prop(&self, device: &str, prop: &str) -> Option<String> {
        let spec = self.spec(Some(device), &["shell", "getprop", prop], GETPROP_TIMEOUT);
        match process::run(&spec).await {
            Ok(result) if result.success() => {
                let value = result.stdout_text().trim().to_string();
                (!value.is_empty()).then_some(value)
            }
            Ok(result) => {
                log::debug!("getprop {prop} on {device} exited {:?}", result.exit_code);
                None
            }
            Err(e) => {
                log::debug!("getprop {prop} on {device} failed: {e}");
                None
            }
        }
    }

    /// Runs an arbitrary adb subcommand supplied by the user.
    ///
    /// Returns the raw result; callers interpret the exit code since a
    /// non-zero exit is a legitimate outcome for user-driven commands.
    pub async fn run_user_command(
        &self,
        device: Option<&str>,
        args: &[String],
    ) -> Result<ProcessResult> {
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let spec = self.spec(device, &arg_refs, DEFAULT_TIMEOUT);
        process::run(&spec).await
    }

    pub async fn push_file(
        &self,
        device: Option<&str>,
        local: &Path,
        remote: &str,
    ) -> Result<String> {
        let local = local.to_string_lossy();
        let result = self
            .exec_checked(device, &["push", &local, remote], DEFAULT_TIMEOUT)
            .await?;
        Ok(result.stdout_text().trim().to_string())
    }

    pub async fn pull_file(
        &self,
        device: Option<&str>,
        remote: &str,
        local: &Path,
    ) -> Result<String> {
        let local = local.to_string_lossy();
        let result = self
            .exec_checked(device, &["pull", remote, &local], DEFAULT_TIMEOUT)
            .await?;
        Ok(result.stdout_text().trim().to_string())
    }

    /// Captures a screenshot to `dest` as PNG.
    ///
    /// `exec-out screencap -p` streams the image over stdout, so the
    /// capture runs in binary mode and the bytes are held in memory
    /// until the command has succeeded and the payload looks like a
    /// PNG. No partial file is ever left at `dest`.
    pub async fn capture_screenshot(&self, device: Option<&str>, dest: &Path) -> Result<PathBuf> {
        let spec = self
            .spec(device, &["exec-out", "screencap", "-p"], DEFAULT_TIMEOUT)
            .binary();
        let result = process::run(&spec).await?;
        if !result.success() {
            return Err(BridgeError::command_failed(
                spec.display_command(),
                result.exit_code,
                result.stderr.trim().to_string(),
            ));
        }

        let bytes = result.stdout.into_bytes();
        if bytes.len() < PNG_MAGIC.len() || bytes[..PNG_MAGIC.len()] != PNG_MAGIC {
            return Err(BridgeError::parse(
                "screencap output",
                "payload is not a PNG image",
            ));
        }

        std::fs::write(dest, &bytes)?;
        Ok(dest.to_path_buf())
    }

    /// Dumps the current log buffer (`logcat -d`), optionally limited
    /// to the most recent `lines` entries.
    pub async fn dump_logcat(&self, device: Option<&str>, lines: Option<u32>) -> Result<String> {
        let line_arg;
        let mut args = vec!["logcat", "-d"];
        if let Some(n) = lines {
            line_arg = n.to_string();
            args.push("-t");
            args.push(&line_arg);
        }
        let result = self.exec_checked(device, &args, DEFAULT_TIMEOUT).await?;
        Ok(result.stdout_text().to_string())
    }

    /// Follows the device log until the child is killed or the stream
    /// ends. No timeout is applied; the caller owns the lifetime.
    pub async fn stream_logcat(&self, device: Option<&str>) -> Result<StreamingChild> {
        let args = Self::device_args(device, &["logcat"]);
        let spec = ProcessSpec::new(&self.executable).args(args);
        process::run_streaming(&spec).await
    }
}
