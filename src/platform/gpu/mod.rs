//! GPU usage providers.
//!
//! NVML is preferred when the `nvml` feature is enabled; otherwise a
//! `nvidia-smi` shell-out is used. No provider at all is a normal outcome
//! (no GPU, no driver); telemetry reports `gpu: None` in that case.

#[cfg(feature = "nvml")]
mod nvml;
mod smi;

#[cfg(feature = "nvml")]
pub use nvml::NvmlGpuProvider;
pub use smi::NvidiaSmiProvider;

use crate::core::telemetry::GpuProvider;
use crate::error::{BridgeError, Result};

/// Pick the first working GPU provider.
pub fn get_gpu_provider() -> Result<Box<dyn GpuProvider>> {
    #[cfg(feature = "nvml")]
    {
        if let Ok(provider) = NvmlGpuProvider::new() {
            return Ok(Box::new(provider));
        }
    }

    if let Ok(provider) = NvidiaSmiProvider::new() {
        return Ok(Box::new(provider));
    }

    Err(BridgeError::gpu_not_available("no supported GPU found"))
}
