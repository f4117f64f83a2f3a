//! NVIDIA GPU provider using NVML.

use nvml_wrapper::Nvml;

use crate::core::telemetry::{GpuProvider, GpuUsage};
use crate::error::{BridgeError, Result};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct NvmlGpuProvider {
    nvml: Nvml,
    device_index: u32,
}

impl NvmlGpuProvider {
    /// Initialize NVML and select the first available GPU.
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    pub fn with_device_index(index: u32) -> Result<Self> {
        let nvml = Nvml::init()
            .map_err(|e| BridgeError::gpu_not_available(format!("failed to init NVML: {e}")))?;

        // Verify the device exists before committing to it.
        nvml.device_by_index(index)
            .map_err(|e| BridgeError::gpu_not_available(format!("GPU {index} not found: {e}")))?;

        Ok(Self {
            nvml,
            device_index: index,
        })
    }
}

impl GpuProvider for NvmlGpuProvider {
    fn name(&self) -> &'static str {
        "nvml"
    }

    fn collect_usage(&mut self) -> Result<GpuUsage> {
        let device = self.nvml.device_by_index(self.device_index).map_err(|e| {
            BridgeError::gpu_not_available(format!("failed to get GPU device: {e}"))
        })?;

        let utilization = device.utilization_rates().map(|u| u.gpu).unwrap_or(0);
        let memory = device.memory_info().map_err(|e| {
            BridgeError::gpu_not_available(format!("failed to get GPU memory info: {e}"))
        })?;

        Ok(GpuUsage {
            percent: utilization as f32,
            memory_used_gb: memory.used as f64 / BYTES_PER_GB,
            memory_total_gb: memory.total as f64 / BYTES_PER_GB,
        })
    }
}
