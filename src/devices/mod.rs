//! Device matrix
//!
//! Device profiles are the rows of the device list a run targets. Each
//! profile is the runtime context of the test instances created for it.

pub mod capabilities;
pub mod filter;

pub use capabilities::desired_capabilities;
pub use filter::DeviceFilter;

use crate::selection::DeviceBound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One target device
///
/// `device_type` and `platform_name` are kept as authored. They are matched
/// against declarations by the selection engine, which reports values it
/// does not recognise.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceProfile {
    name: String,
    device_type: String,
    platform_name: String,
    #[serde(default)]
    platform_version: String,
    /// Extra desired capabilities specific to this device
    #[serde(default)]
    capabilities: BTreeMap<String, serde_json::Value>,
}

impl DeviceProfile {
    pub fn new(
        name: impl Into<String>,
        device_type: impl Into<String>,
        platform_name: impl Into<String>,
        platform_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            device_type: device_type.into(),
            platform_name: platform_name.into(),
            platform_version: platform_version.into(),
            capabilities: BTreeMap::new(),
        }
    }

    /// Add a device-specific desired capability
    pub fn with_capability(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.capabilities.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }

    pub fn capabilities(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.capabilities
    }
}

impl DeviceBound for DeviceProfile {
    fn device_type(&self) -> Option<&str> {
        non_empty(&self.device_type)
    }

    fn platform_name(&self) -> Option<&str> {
        non_empty(&self.platform_name)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
