//! NVIDIA GPU provider shelling out to `nvidia-smi`.
//!
//! Used when NVML is unavailable. The query is a real process invocation,
//! so the telemetry layer keeps its result behind a TTL cache; here we
//! only bound a single invocation so a wedged driver cannot stall the
//! worker's usage queue forever.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::core::telemetry::{GpuProvider, GpuUsage};
use crate::error::{BridgeError, Result};

const SMI_TIMEOUT: Duration = Duration::from_secs(5);
const MB_PER_GB: f64 = 1024.0;

pub struct NvidiaSmiProvider {
    executable: PathBuf,
}

impl NvidiaSmiProvider {
    pub fn new() -> Result<Self> {
        let executable = which::which("nvidia-smi").map_err(|_| {
            BridgeError::gpu_not_available("nvidia-smi not found on PATH")
        })?;
        Ok(Self { executable })
    }

    fn query(&self) -> Result<String> {
        let mut child = Command::new(&self.executable)
            .args([
                "--query-gpu=utilization.gpu,memory.used,memory.total",
                "--format=csv,noheader,nounits",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // nvidia-smi output is tiny; polling try_wait before reading the
        // pipe cannot deadlock.
        let deadline = Instant::now() + SMI_TIMEOUT;
        loop {
            match child.try_wait()? {
                Some(status) => {
                    if !status.success() {
                        return Err(BridgeError::gpu_not_available(format!(
                            "nvidia-smi exited with {status}"
                        )));
                    }
                    break;
                }
                None => {
                    if Instant::now() > deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BridgeError::timeout("nvidia-smi", SMI_TIMEOUT));
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
            }
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            use std::io::Read;
            stdout.read_to_string(&mut output)?;
        }
        Ok(output)
    }
}

impl GpuProvider for NvidiaSmiProvider {
    fn name(&self) -> &'static str {
        "nvidia-smi"
    }

    fn collect_usage(&mut self) -> Result<GpuUsage> {
        let output = self.query()?;
        parse_smi_line(&output)
    }
}

/// Parse the first CSV line: `utilization, memory.used, memory.total`,
/// both memory figures in MiB.
fn parse_smi_line(output: &str) -> Result<GpuUsage> {
    let line = output
        .lines()
        .next()
        .ok_or_else(|| BridgeError::parse("nvidia-smi output", "empty output"))?;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(BridgeError::parse(
            "nvidia-smi output",
            format!("expected 3 fields, got {}: {line:?}", fields.len()),
        ));
    }

    let percent: f32 = fields[0]
        .parse()
        .map_err(|_| BridgeError::parse("nvidia-smi utilization", fields[0]))?;
    let used_mb: f64 = fields[1]
        .parse()
        .map_err(|_| BridgeError::parse("nvidia-smi memory.used", fields[1]))?;
    let total_mb: f64 = fields[2]
        .parse()
        .map_err(|_| BridgeError::parse("nvidia-smi memory.total", fields[2]))?;

    Ok(GpuUsage {
        percent,
        memory_used_gb: used_mb / MB_PER_GB,
        memory_total_gb: total_mb / MB_PER_GB,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_csv_line() {
        let usage = parse_smi_line("37, 2048, 8192\n").unwrap();
        assert_eq!(usage.percent, 37.0);
        assert_eq!(usage.memory_used_gb, 2.0);
        assert_eq!(usage.memory_total_gb, 8.0);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_smi_line("").is_err());
        assert!(parse_smi_line("37, 2048").is_err());
        assert!(parse_smi_line("n/a, x, y").is_err());
    }
}
