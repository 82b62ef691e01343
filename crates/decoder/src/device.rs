//! Compute device discovery and binding.
//!
//! Device visibility is carried as a value on the binding instead of being
//! written into the process environment, so several sessions in one process
//! (tests, mostly) never see each other's scoping.

use crate::error::SessionError;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Variable device-bound collaborators read to restrict GPU visibility.
pub const VISIBLE_DEVICES_VAR: &str = "CUDA_VISIBLE_DEVICES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    Cuda,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Physical ordinal (the `N` of `/dev/nvidiaN`; 0 for the host CPU).
    pub ordinal: usize,
    pub kind: DeviceKind,
    pub name: String,
}

impl DeviceInfo {
    pub fn cuda(ordinal: usize) -> Self {
        Self {
            ordinal,
            kind: DeviceKind::Cuda,
            name: format!("cuda:{ordinal}"),
        }
    }

    pub fn host() -> Self {
        Self {
            ordinal: 0,
            kind: DeviceKind::Cpu,
            name: "cpu".to_string(),
        }
    }
}

/// Devices a session may bind to, addressed by position.
#[derive(Debug, Clone)]
pub struct DeviceInventory {
    devices: Vec<DeviceInfo>,
}

impl DeviceInventory {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self { devices }
    }

    /// A single host CPU device.
    pub fn host_only() -> Self {
        Self::new(vec![DeviceInfo::host()])
    }

    /// Enumerate NVIDIA device nodes under `/dev`; falls back to the host
    /// CPU when none are present.
    pub fn detect() -> Self {
        Self::detect_in(Path::new("/dev"))
    }

    pub fn detect_in(dev_root: &Path) -> Self {
        let mut ordinals: Vec<usize> = fs::read_dir(dev_root)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let name = entry.file_name();
                        let digits = name.to_str()?.strip_prefix("nvidia")?;
                        digits.parse().ok()
                    })
                    .collect()
            })
            .unwrap_or_default();
        ordinals.sort_unstable();

        if ordinals.is_empty() {
            debug!(root = %dev_root.display(), "no GPU device nodes found; using host CPU");
            return Self::host_only();
        }

        Self::new(ordinals.into_iter().map(DeviceInfo::cuda).collect())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Bind device `index`. GPU indices address physical ordinals, so
    /// `--gpu 3` selects `/dev/nvidia3`.
    pub fn bind(&self, index: usize) -> Result<DeviceBinding, SessionError> {
        let unavailable = || SessionError::DeviceUnavailable {
            index,
            available: self.devices.len(),
        };

        let device = self
            .devices
            .iter()
            .find(|device| device.ordinal == index)
            .ok_or_else(unavailable)?;

        Ok(DeviceBinding {
            device: device.clone(),
        })
    }
}

/// Exclusive binding of a session to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBinding {
    device: DeviceInfo,
}

impl DeviceBinding {
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Visibility scoping that restricts a collaborator to exactly this
    /// device. The host binding hides every GPU.
    pub fn visibility(&self) -> DeviceVisibility {
        let value = match self.device.kind {
            DeviceKind::Cuda => self.device.ordinal.to_string(),
            DeviceKind::Cpu => String::new(),
        };
        DeviceVisibility {
            variable: VISIBLE_DEVICES_VAR,
            value,
        }
    }
}

impl fmt::Display for DeviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.device.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceVisibility {
    pub variable: &'static str,
    pub value: String,
}

impl fmt::Display for DeviceVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.variable, self.value)
    }
}
