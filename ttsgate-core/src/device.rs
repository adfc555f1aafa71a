// Device planning
//
// Decides once per process where models run and at which precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Compute device a model is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Mps,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Mps => "mps",
            Device::Cuda => "cuda",
        }
    }

    /// Whether this device is an accelerator (half precision is the default there)
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric precision for model weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float16,
    Float32,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Float16 => "float16",
            DType::Float32 => "float32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested device, as configured by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Mps,
    Cuda,
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "mps" => Ok(Self::Mps),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown device preference '{}'", other)),
        }
    }
}

/// Requested precision, as configured by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DTypePreference {
    #[default]
    Auto,
    Float16,
    Float32,
}

impl FromStr for DTypePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "float16" | "fp16" | "half" => Ok(Self::Float16),
            "float32" | "fp32" | "full" => Ok(Self::Float32),
            other => Err(format!("unknown dtype preference '{}'", other)),
        }
    }
}

/// Which accelerators this host offers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accelerators {
    pub mps: bool,
    pub cuda: bool,
}

impl Accelerators {
    /// Probe the current host.
    ///
    /// MPS is assumed on Apple silicon; CUDA when a driver-provided
    /// `nvidia-smi` is on PATH.
    pub fn detect() -> Self {
        let mps = cfg!(all(target_os = "macos", target_arch = "aarch64"));
        let cuda = std::process::Command::new("nvidia-smi")
            .arg("-L")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        Self { mps, cuda }
    }
}

/// Resolved placement for every model in the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePlan {
    pub device: Device,
    pub dtype: DType,
    pub reason: String,
}

impl DevicePlan {
    /// Resolve a plan against the accelerators of the current host
    pub fn resolve(device: DevicePreference, dtype: DTypePreference) -> Self {
        Self::resolve_with(device, dtype, Accelerators::detect())
    }

    /// Resolve a plan against an explicit accelerator inventory
    pub fn resolve_with(
        device_pref: DevicePreference,
        dtype_pref: DTypePreference,
        available: Accelerators,
    ) -> Self {
        let (device, reason) = match device_pref {
            DevicePreference::Mps if available.mps => (Device::Mps, "user forced mps"),
            DevicePreference::Cuda if available.cuda => (Device::Cuda, "user forced cuda"),
            DevicePreference::Cpu => (Device::Cpu, "user forced cpu"),
            _ if available.cuda => (Device::Cuda, "auto detected cuda"),
            _ if available.mps => (Device::Mps, "auto detected mps"),
            _ => (Device::Cpu, "fallback to cpu"),
        };

        let dtype = match dtype_pref {
            DTypePreference::Float16 => DType::Float16,
            DTypePreference::Float32 => DType::Float32,
            DTypePreference::Auto if device.is_accelerator() => DType::Float16,
            DTypePreference::Auto => DType::Float32,
        };

        info!(device = %device, dtype = %dtype, reason, "Device plan resolved");

        Self {
            device,
            dtype,
            reason: reason.to_string(),
        }
    }

    /// CPU / float32 plan, used where no hardware probing is wanted
    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
            dtype: DType::Float32,
            reason: "fixed cpu".to_string(),
        }
    }
}
