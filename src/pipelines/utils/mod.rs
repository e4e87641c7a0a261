use std::str::FromStr;

use candle_core::Device;
use tracing::warn;

use crate::error::{AnalysisError, Result};

/// Which device inference runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// CUDA 0 (or Metal) when available, otherwise CPU.
    #[default]
    Auto,
    /// Force CPU even if an accelerator is available.
    Cpu,
    /// A specific CUDA device by index.
    Cuda(usize),
}

impl DeviceRequest {
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Auto => {
                if candle_core::utils::cuda_is_available() {
                    match Device::new_cuda(0) {
                        Ok(device) => return Ok(device),
                        Err(e) => warn!("CUDA reported available but failed to init: {e}"),
                    }
                }
                if candle_core::utils::metal_is_available() {
                    match Device::new_metal(0) {
                        Ok(device) => return Ok(device),
                        Err(e) => warn!("Metal reported available but failed to init: {e}"),
                    }
                }
                Ok(Device::Cpu)
            }
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                AnalysisError::ModelUnavailable(format!(
                    "Failed to init CUDA device {i}: {e}. Try `--device cpu` as fallback."
                ))
            }),
        }
    }
}

impl FromStr for DeviceRequest {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceRequest::Auto),
            "cpu" => Ok(DeviceRequest::Cpu),
            "cuda" => Ok(DeviceRequest::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(DeviceRequest::Cuda)
                .ok_or_else(|| format!("unknown device '{s}', expected auto, cpu or cuda:N")),
        }
    }
}

impl std::fmt::Display for DeviceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRequest::Auto => write!(f, "auto"),
            DeviceRequest::Cpu => write!(f, "cpu"),
            DeviceRequest::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}
