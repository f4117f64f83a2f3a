//! Snapshot and process-listing sources backed by sysinfo, plus the TTL
//! cache that shields the expensive disk/GPU probes.

use std::time::{Duration, Instant};

use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

use crate::error::Result;
use crate::platform;

use super::{
    CpuMetricUnit, DiskUsage, GpuProvider, GpuUsage, MemoryUsage, ProcessSample,
    ResourceSnapshot, TOP_PROCESS_COUNT,
};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Produces usage snapshots. The worker drives exactly one implementation
/// at a time, strictly serialized.
pub trait UsageSource: Send {
    fn collect_usage(&mut self) -> Result<ResourceSnapshot>;
}

/// Produces process listings, independently of [`UsageSource`].
pub trait ProcessSource: Send {
    fn collect_processes(&mut self) -> Vec<ProcessSample>;
}

/// Time-bounded cache for an expensive probe.
///
/// Within the TTL window the cached value is returned even if stale. A
/// fetch failure after expiry falls back to the last good value, or the
/// caller's default when nothing has ever succeeded; expensive telemetry
/// never propagates an error upward.
pub(crate) struct TtlCache<T: Clone> {
    ttl: Duration,
    entry: Option<(T, Instant)>,
    last_good: Option<T>,
}

impl<T: Clone> TtlCache<T> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: None,
            last_good: None,
        }
    }

    pub(crate) fn get_or_refresh<E>(
        &mut self,
        fetch: impl FnOnce() -> std::result::Result<T, E>,
        default: impl FnOnce() -> T,
    ) -> T {
        if let Some((value, fetched_at)) = &self.entry {
            if fetched_at.elapsed() < self.ttl {
                return value.clone();
            }
        }
        match fetch() {
            Ok(value) => {
                self.entry = Some((value.clone(), Instant::now()));
                self.last_good = Some(value.clone());
                value
            }
            Err(_) => self.last_good.clone().unwrap_or_else(default),
        }
    }
}

/// Real usage source: CPU/memory via sysinfo, disk and GPU behind TTL
/// caches.
pub struct SysinfoUsage {
    system: System,
    disks: Disks,
    first_sample: bool,
    disk_probing: bool,
    disk_cache: TtlCache<DiskUsage>,
    gpu_cache: TtlCache<Option<GpuUsage>>,
    gpu_provider: Option<Box<dyn GpuProvider>>,
}

impl SysinfoUsage {
    pub fn new(cache_ttl: Duration, disk_probing: bool) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());

        let gpu_provider = match platform::gpu::get_gpu_provider() {
            Ok(provider) => {
                log::debug!("GPU telemetry via {}", provider.name());
                Some(provider)
            }
            Err(e) => {
                log::debug!("GPU telemetry unavailable: {e}");
                None
            }
        };

        Self {
            system: System::new_with_specifics(refresh_kind),
            disks: Disks::new_with_refreshed_list(),
            first_sample: true,
            disk_probing,
            disk_cache: TtlCache::new(cache_ttl),
            gpu_cache: TtlCache::new(cache_ttl),
            gpu_provider,
        }
    }

    fn collect_memory(&self) -> MemoryUsage {
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        MemoryUsage {
            used_gb: used as f64 / BYTES_PER_GB,
            total_gb: total as f64 / BYTES_PER_GB,
            percent: if total > 0 {
                (used as f32 / total as f32) * 100.0
            } else {
                0.0
            },
        }
    }
}

impl UsageSource for SysinfoUsage {
    fn collect_usage(&mut self) -> Result<ResourceSnapshot> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        // CPU usage is a delta between two samples of cumulative tick
        // counters; there is no prior sample on the first call.
        let cpu_percent = if self.first_sample {
            self.first_sample = false;
            0.0
        } else {
            self.system.global_cpu_usage().clamp(0.0, 100.0)
        };

        let disk = if self.disk_probing {
            let disks = &mut self.disks;
            self.disk_cache
                .get_or_refresh(|| probe_disks(disks), DiskUsage::default)
        } else {
            DiskUsage::default()
        };

        let gpu = match self.gpu_provider.as_mut() {
            Some(provider) => self
                .gpu_cache
                .get_or_refresh(|| provider.collect_usage().map(Some), || None),
            None => None,
        };

        Ok(ResourceSnapshot {
            cpu_percent,
            memory: self.collect_memory(),
            disk,
            gpu,
            captured_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
        })
    }
}

fn probe_disks(disks: &mut Disks) -> Result<DiskUsage> {
    disks.refresh(true);
    let mut total: u64 = 0;
    let mut available: u64 = 0;
    for disk in disks.iter() {
        if disk.is_removable() || disk.total_space() == 0 {
            continue;
        }
        total += disk.total_space();
        available += disk.available_space();
    }
    let used = total.saturating_sub(available);
    Ok(DiskUsage {
        used_gb: used as f64 / BYTES_PER_GB,
        total_gb: total as f64 / BYTES_PER_GB,
        percent: if total > 0 {
            (used as f32 / total as f32) * 100.0
        } else {
            0.0
        },
    })
}

/// Real process lister. Owns its own sysinfo state so listings never
/// contend with usage snapshots.
pub struct SysinfoProcesses {
    system: System,
    unit: CpuMetricUnit,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_memory(MemoryRefreshKind::everything())
            .with_processes(ProcessRefreshKind::nothing().with_cpu().with_memory());
        Self {
            system: System::new_with_specifics(refresh_kind),
            unit: platform::current().process_cpu_unit(),
        }
    }
}

impl Default for SysinfoProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoProcesses {
    fn collect_processes(&mut self) -> Vec<ProcessSample> {
        self.system.refresh_memory();
        self.system
            .refresh_processes(ProcessesToUpdate::All, true);

        let total_memory = self.system.total_memory();
        let mut samples: Vec<ProcessSample> = self
            .system
            .processes()
            .values()
            .map(|proc| {
                let memory = proc.memory();
                let cpu_metric = match self.unit {
                    CpuMetricUnit::Percent => proc.cpu_usage() as f64,
                    CpuMetricUnit::CumulativeSeconds => {
                        proc.accumulated_cpu_time() as f64 / 1000.0
                    }
                };
                ProcessSample {
                    pid: proc.pid().as_u32(),
                    name: proc.name().to_string_lossy().to_string(),
                    cpu_metric,
                    cpu_metric_unit: self.unit,
                    memory_mb: memory as f64 / BYTES_PER_MB,
                    memory_percent: if total_memory > 0 {
                        (memory as f32 / total_memory as f32) * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        samples.sort_by(|a, b| {
            b.cpu_metric
                .partial_cmp(&a.cpu_metric)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        samples.truncate(TOP_PROCESS_COUNT);
        samples
    }
}
