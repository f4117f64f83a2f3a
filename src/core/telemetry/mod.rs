//! Off-thread resource telemetry.
//!
//! All resource probing runs on an isolated worker thread with its own
//! runtime, so a slow OS query (a disk shell-out, a GPU probe) can never
//! stall the host. The host talks to the worker through a typed
//! request/response protocol ([`protocol`]); the facade degrades to
//! zero-valued answers whenever the worker is not ready or has died;
//! telemetry must never crash the rest of the application.

pub mod protocol;
mod source;
mod worker;

use serde::{Deserialize, Serialize};

pub use source::{ProcessSource, SysinfoProcesses, SysinfoUsage, UsageSource};
pub use worker::TelemetryHandle;

/// Unit of [`ProcessSample::cpu_metric`].
///
/// The per-process CPU figure is platform-defined: a percentage on Unix,
/// cumulative CPU seconds on Windows. Callers must not assume uniform
/// units; the unit travels with every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CpuMetricUnit {
    Percent,
    CumulativeSeconds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_gb: f64,
    pub total_gb: f64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used_gb: f64,
    pub total_gb: f64,
    pub percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuUsage {
    pub percent: f32,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

/// Point-in-time resource snapshot. Every field is independently
/// best-effort: a missing GPU is `None`, a failed or disabled disk probe is
/// a zero-valued [`DiskUsage`], neither is an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Always within `[0, 100]`; exactly 0 on the first sample after cold
    /// start, since CPU usage is a delta between two samples.
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub gpu: Option<GpuUsage>,
    pub captured_at_epoch_ms: i64,
}

impl ResourceSnapshot {
    /// The structured zero-value returned when no data is available.
    pub fn zero() -> Self {
        Self {
            captured_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }
}

/// One entry of the top-N process listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// See [`CpuMetricUnit`] for what this number means.
    pub cpu_metric: f64,
    pub cpu_metric_unit: CpuMetricUnit,
    pub memory_mb: f64,
    pub memory_percent: f32,
}

/// Maximum number of entries in a process listing; bounds serialization
/// cost when the host marshals the list across its boundary.
pub const TOP_PROCESS_COUNT: usize = 10;

/// GPU usage provider. Implementations live in [`crate::platform::gpu`];
/// absence of a provider is normal and never an error at this level.
pub trait GpuProvider: Send {
    fn name(&self) -> &'static str;
    fn collect_usage(&mut self) -> crate::error::Result<GpuUsage>;
}
